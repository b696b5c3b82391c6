//! Procedures served by `ja serve`.

use protocol::MethodName;
use serde::{Deserialize, Serialize};
use server::{Handler, MethodError};

#[derive(Debug, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub good_id: i64,
    #[serde(rename = "Greetings")]
    pub greetings: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PingResponse {
    #[serde(rename = "Echo")]
    pub echo: String,
    #[serde(rename = "Num")]
    pub num: i64,
}

/// Echoes the greeting and id back. The greeting `"foobar"` fails, which
/// exercises the `"call error"` status.
pub async fn ping(req: PingRequest) -> Result<PingResponse, MethodError> {
    if req.greetings == "foobar" {
        return Err(MethodError::failed("foobar"));
    }
    Ok(PingResponse {
        echo: req.greetings,
        num: req.good_id,
    })
}

pub fn handler() -> anyhow::Result<Handler> {
    let ping_name = MethodName::new("Ping").ok_or_else(|| anyhow::anyhow!("invalid method name"))?;
    Ok(Handler::new().register(ping_name, ping))
}
