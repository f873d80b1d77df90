//! Reporting: the serializable design summary and formatted terminal output.

pub mod format;

pub use format::*;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::{ESeries, FetParams};
use crate::stage::{BiasNetwork, BiasTargets, CommonSourceStage, Headroom, OperatingPoint};

/// Everything `design --json` writes.
#[derive(Debug, Clone, Serialize)]
pub struct DesignReport {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub params: FetParams,
    pub series: ESeries,
    pub vdd: f64,
    pub targets: Option<BiasTargets>,
    pub network: BiasNetwork,
    pub operating_point: OperatingPoint,
    pub gain_db: f64,
    pub zi: f64,
    pub zo: f64,
    pub headroom: Headroom,
}

impl DesignReport {
    pub fn new(stage: &CommonSourceStage, targets: Option<BiasTargets>) -> Self {
        Self {
            tool: "fetbias".to_string(),
            generated: Local::now(),
            params: stage.params(),
            series: stage.series(),
            vdd: stage.vdd(),
            targets,
            network: stage.network(),
            operating_point: stage.operating_point(),
            gain_db: stage.gain_db(),
            zi: stage.zi(),
            zo: stage.zo(),
            headroom: stage.headroom(),
        }
    }
}
