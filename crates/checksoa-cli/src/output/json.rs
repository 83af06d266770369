//! JSON document for `--json`.

use checksoa_client::{CheckError, Report};
use checksoa_core::{MasterResult, SerialResult, Status};
use serde::Serialize;

/// The whole run as one object
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub zone: &'a str,
    pub timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<JsonMaster>,
    pub responses: Vec<JsonResponse>,
}

#[derive(Debug, Serialize)]
pub struct JsonMaster {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub serial: u32,
    pub resptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub serial: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    pub resptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&MasterResult> for JsonMaster {
    fn from(master: &MasterResult) -> Self {
        Self {
            name: master.name.clone(),
            ip: Some(master.address.to_string()),
            serial: master.serial,
            resptime: master.elapsed_ms(),
            error: None,
        }
    }
}

impl From<&SerialResult> for JsonResponse {
    fn from(result: &SerialResult) -> Self {
        Self {
            name: result.server_name.clone(),
            ip: result.address.map(|ip| ip.to_string()),
            serial: result.serial().unwrap_or(0),
            delta: result.delta,
            resptime: result.elapsed_ms(),
            nsid: result.nsid.clone(),
            error: result.error().map(ToString::to_string),
        }
    }
}

impl<'a> JsonOutput<'a> {
    /// Document for a completed run
    pub fn from_report(report: &'a Report, timestamp: &'a str) -> Self {
        Self {
            status: report.status,
            error: report.error_message(),
            zone: &report.zone,
            timestamp,
            master: report.master.as_ref().map(JsonMaster::from),
            responses: report.responses.iter().map(JsonResponse::from).collect(),
        }
    }

    /// Document for a run that ended early
    pub fn from_error(err: &CheckError, zone: &'a str, timestamp: &'a str) -> Self {
        let master = match err {
            CheckError::MasterUnresolved(name) => Some(JsonMaster {
                name: name.clone(),
                ip: None,
                serial: 0,
                resptime: 0.0,
                error: Some(err.to_string()),
            }),
            CheckError::Master {
                name,
                address,
                source,
            } => Some(JsonMaster {
                name: name.clone(),
                ip: Some(address.to_string()),
                serial: 0,
                resptime: 0.0,
                error: Some(source.to_string()),
            }),
            _ => None,
        };

        Self {
            status: err.status(),
            error: Some(err.to_string()),
            zone,
            timestamp,
            master,
            responses: Vec::new(),
        }
    }
}
