use crate::types::{Position, PursuerState, RuntimeEvent};

use super::pursuer::{PursuerAgent, PursuerEvent};
use super::scheduler::pursuer_slot;
use super::GameEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    /// A frightened pursuer touched the player.
    Capture { pursuer: usize },
    /// A chasing pursuer touched the player.
    Caught { pursuer: usize },
}

/// Contacts between the player and every non-captured pursuer, in roster
/// order. Sharing a cell counts, and so does trading cells during the tick.
pub fn detect_contacts(
    player_before: Position,
    player_after: Position,
    pursuers: &[PursuerAgent],
    pursuers_before: &[Position],
) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for (idx, pursuer) in pursuers.iter().enumerate() {
        if pursuer.state == PursuerState::Captured {
            continue;
        }
        let overlap = pursuer.position == player_after;
        let swapped = pursuers_before
            .get(idx)
            .is_some_and(|before| *before == player_after && pursuer.position == player_before);
        if !overlap && !swapped {
            continue;
        }
        contacts.push(match pursuer.state {
            PursuerState::Frightened => Contact::Capture { pursuer: idx },
            _ => Contact::Caught { pursuer: idx },
        });
    }
    contacts
}

impl GameEngine {
    /// Returns true when a caught player cost a life, which resets the round.
    pub(super) fn resolve_contacts(
        &mut self,
        player_before: Position,
        pursuers_before: &[Position],
    ) -> bool {
        let contacts = detect_contacts(
            player_before,
            self.player.position,
            &self.pursuers,
            pursuers_before,
        );
        for contact in contacts {
            match contact {
                Contact::Capture { pursuer } => self.capture_pursuer(pursuer),
                Contact::Caught { .. } => {
                    if self.grace.is_active() {
                        continue;
                    }
                    // The round resets, so later contacts this tick are moot.
                    self.lose_life();
                    return true;
                }
            }
        }
        false
    }

    fn capture_pursuer(&mut self, idx: usize) {
        let Some(pursuer) = self.pursuers.get_mut(idx) else {
            return;
        };
        if pursuer.handle(PursuerEvent::ContactWithPlayer) != PursuerState::Captured {
            return;
        }
        let house = self.maze.house_cell().unwrap_or(pursuer.position);
        pursuer.send_to(house);
        pursuer.respawn.start(self.config.captured_respawn_ms);
        self.scheduler.reset(pursuer_slot(idx));

        let points = self.config.capture_points;
        self.score = self.score.saturating_add(points);
        self.stats.pursuers_captured += 1;
        self.events.push(RuntimeEvent::PursuerCaptured {
            pursuer: idx,
            points,
        });
    }
}
