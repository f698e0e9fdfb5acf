//! Role-contract picker: out of a windowed pool, select ten players that
//! cover every role twice. Fill order per role is primary matches, then
//! secondary matches, then flex (declared SMG, or anyone who has waited
//! long enough for hard fill).

use crate::player::{Role, WeaponClass};
use crate::queue::QueueEntry;

/// Try to satisfy the two-per-role contract over `pool`. Returns the ten
/// selected entries, or None when some role cannot reach two players.
pub fn pick_role_contract(
    pool: &[QueueEntry],
    now_ms: i64,
    flex_after_ms: i64,
) -> Option<Vec<QueueEntry>> {
    if pool.len() < 10 {
        return None;
    }

    let mut remaining: Vec<&QueueEntry> = pool.iter().collect();
    remaining.sort_by_key(|e| e.queued_at);

    let mut selected: Vec<QueueEntry> = Vec::with_capacity(10);

    for role in Role::ALL {
        let native = role.native_class();
        let mut filled = 0;

        // Primary matches first, then secondary.
        for pass in 0..2 {
            while filled < 2 {
                let found = remaining.iter().position(|e| match pass {
                    0 => e.classes.primary == native,
                    _ => e.classes.secondary == native,
                });
                match found {
                    Some(idx) => {
                        selected.push(remaining.remove(idx).clone());
                        filled += 1;
                    }
                    None => break,
                }
            }
        }

        // Flex: declared SMGs cover any tier role; anyone covers anything
        // once they have waited past the hard-fill threshold.
        while filled < 2 {
            let found = remaining.iter().position(|e| {
                let smg_flex = role != Role::Sniper && e.classes.primary == WeaponClass::Smg;
                let hard_fill = e.wait_ms(now_ms) >= flex_after_ms;
                smg_flex || hard_fill
            });
            match found {
                Some(idx) => {
                    selected.push(remaining.remove(idx).clone());
                    filled += 1;
                }
                None => return None,
            }
        }
    }

    debug_assert_eq!(selected.len(), 10);
    Some(selected)
}
