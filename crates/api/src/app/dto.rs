use serde::Serialize;

use gatehouse_auth::Decision;

#[derive(Debug, Serialize)]
pub struct GuardResponse {
    pub area: String,
    pub state: &'static str,
    pub view: Decision,
}

#[derive(Debug, Serialize)]
pub struct AreasResponse {
    pub areas: Vec<String>,
}
