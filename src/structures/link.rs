//! Link reactor: relays energy from source links to the storage link

use crate::colony::TickContext;
use crate::core::error::Result;
use crate::host::{IntentResult, StructureIntent};
use crate::managers::{ColonyMemory, Manager};
use crate::spawning::Priority;

pub struct LinkManager;

impl Manager for LinkManager {
    fn name(&self) -> &'static str {
        "LinkManager"
    }

    fn phases(&self) -> &'static [Priority] {
        &[Priority::Standard]
    }

    fn run(
        &mut self,
        _phase: Priority,
        ctx: &mut TickContext<'_>,
        _colony: &mut ColonyMemory,
    ) -> Result<()> {
        for room in ctx.normal_rooms() {
            let Some(receiver) = ctx.storage_link(&room) else {
                continue;
            };
            // The receiver only takes a full load once it has been emptied
            if receiver.energy() > 0 {
                continue;
            }

            let tanks = ctx.tanks(&room);
            let Some(sender) = tanks
                .iter()
                .filter(|t| t.is_link() && t.source_id().is_some())
                .find(|t| t.structure.store.is_some_and(|s| s.is_full()))
            else {
                continue;
            };

            let intent = StructureIntent::LinkTransfer(receiver.id.clone());
            let result = ctx.host_mut().issue_structure(&sender.structure.id, intent);
            if result == IntentResult::Ok {
                tracing::debug!(room = %room, from = %sender.structure.id, to = %receiver.id, "link relay");
            }
        }
        Ok(())
    }
}
