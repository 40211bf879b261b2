//! Tagged event payloads published on the event bus (spec §6: "Messages are
//! tagged tuples `(event_kind, payload)`").

use crate::alarm::Alarm;
use crate::coa::Coa;
use crate::conjunction::Conjunction;
use crate::ids::{CoaId, MissionId};
use crate::mission::Mission;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    AlarmRaised(Arc<Alarm>),
    AlarmAcknowledged(Arc<Alarm>),
    AlarmResolved(Arc<Alarm>),
    ConjunctionDetected(Arc<Conjunction>),
    ConjunctionExpired(Arc<Conjunction>),
    CoasGenerated {
        conjunction_id: crate::ids::ConjunctionId,
        coas: Vec<Arc<Coa>>,
    },
    CoaCompleted(Arc<Coa>),
    CoaFailed {
        coa_id: CoaId,
        reason: String,
    },
    MissionStatusChanged {
        mission_id: MissionId,
        mission: Arc<Mission>,
    },
    MissionPermanentFailure {
        mission_id: MissionId,
        reason: String,
    },
}
