use crate::side::Side;
use crate::unit::UnitRole;

const CENTER_ORDER: [UnitRole; 3] = [UnitRole::Front, UnitRole::Flank, UnitRole::Support];
const FLANK_ORDER: [UnitRole; 3] = [UnitRole::Flank, UnitRole::Front, UnitRole::Support];

fn pool_order(on_flank: bool, back_row: bool) -> &'static [UnitRole] {
    let order: &'static [UnitRole; 3] = if on_flank { &FLANK_ORDER } else { &CENTER_ORDER };
    // Support cohorts are kept for the back row when it exists
    if back_row {
        &order[..2]
    } else {
        &order[..]
    }
}

/// Column indices from the center outwards, alternating left then right.
///
/// Width 5 yields `2, 1, 3, 0, 4`.
pub fn center_out(width: usize) -> impl Iterator<Item = usize> {
    let center = width / 2;
    (0..width).map(move |i| {
        if i % 2 == 0 {
            center + i / 2
        } else {
            center - (i + 1) / 2
        }
    })
}

fn fill_front_row(side: &mut Side, flank_size: usize, keep_support: bool) -> usize {
    let width = side.cohorts.width();
    let mut moved = 0;
    for col in center_out(width) {
        if side.cohorts.cell(0, col).is_some() {
            continue;
        }
        let on_flank = col < flank_size || col >= width - flank_size;
        if pool_order(on_flank, keep_support)
            .iter()
            .any(|&pool| side.cohorts.deploy_from_reserve(pool, 0, col).is_some())
        {
            moved += 1;
        }
    }
    moved
}

/// Fill empty frontline cells from the reserve pools.
///
/// The `flank_size` outermost columns on each edge prefer the flank pool,
/// the rest prefer the front pool. With a back row, support cohorts only
/// fill cells behind occupied front cells, unless nothing else is left to
/// hold the front row. Returns the number of cohorts moved.
pub fn reinforce(side: &mut Side, back_row: bool) -> usize {
    if !side.alive {
        return 0;
    }

    let width = side.cohorts.width();
    let flank_size = side.flank_size();
    let back_row = back_row && side.cohorts.rows() > 1;

    let mut moved = fill_front_row(side, flank_size, back_row);
    let front_row_empty = (0..width).all(|col| side.cohorts.cell(0, col).is_none());
    if back_row && front_row_empty {
        moved += fill_front_row(side, flank_size, false);
    }

    if back_row {
        for col in center_out(width) {
            if side.cohorts.cell(0, col).is_some()
                && side.cohorts.cell(1, col).is_none()
                && side
                    .cohorts
                    .deploy_from_reserve(UnitRole::Support, 1, col)
                    .is_some()
            {
                moved += 1;
            }
        }
    }

    if moved > 0 {
        log::trace!("{} reinforced {} cells", side.kind, moved);
    }
    moved
}
