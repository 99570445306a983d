//! Adjacency queries over a loaded board.
//!
//! Area-level adjacency comes from the symmetric border list. Fleets are
//! further restricted by terrain, by the per-coast allow-lists of split-coast
//! areas, and by the fleet barriers of the map. Unknown coast ids fail closed.

use super::area::{AreaId, Coast};
use super::map::Board;

impl Board {
    /// Returns true if the two areas share a border edge.
    pub fn borders_on(&self, a: AreaId, b: AreaId) -> bool {
        self.borders(a).binary_search(&b).is_ok()
    }

    /// Returns true if a unit can move from `a` to `b`.
    ///
    /// Armies need a border and a destination that is neither sea nor lagoon.
    /// Fleets need a border between two sea-or-coast areas that is not a fleet
    /// barrier; a coast given for a split-coast endpoint narrows the check to
    /// that coast's allow-list. Coasts are ignored for armies.
    pub fn is_adjacent(
        &self,
        a: AreaId,
        b: AreaId,
        fleet: bool,
        a_coast: Option<Coast>,
        b_coast: Option<Coast>,
    ) -> bool {
        if !self.contains(a) || !self.contains(b) || !self.borders_on(a, b) {
            return false;
        }
        let (from, to) = (self.area(a), self.area(b));

        if !fleet {
            return to.accepts_army();
        }

        if !from.accepts_fleet() || !to.accepts_fleet() {
            return false;
        }
        if self.fleet_barriers.contains(&(a.min(b), a.max(b))) {
            return false;
        }
        self.coast_allows(a, a_coast, b) && self.coast_allows(b, b_coast, a)
    }

    /// Checks the coast allow-list of `area` towards `other`.
    fn coast_allows(&self, area: AreaId, coast: Option<Coast>, other: AreaId) -> bool {
        let Some(coast) = coast else {
            return true;
        };
        match self.coast_links.get(&(area, coast)) {
            Some(links) => links.binary_search(&other).is_ok(),
            None => {
                log::warn!(
                    "unknown coast {}/{}; treating as not adjacent",
                    self.code(area),
                    coast.abbr()
                );
                false
            }
        }
    }

    /// Returns the coasts of `dst` a fleet at `src`/`src_coast` can reach.
    ///
    /// Empty when `dst` has no named coasts or is not fleet-adjacent at all.
    pub fn fleet_coasts_to(&self, src: AreaId, src_coast: Option<Coast>, dst: AreaId) -> Vec<Coast> {
        let Some(area) = self.get(dst) else {
            return Vec::new();
        };
        area.coasts
            .iter()
            .copied()
            .filter(|&c| self.is_adjacent(src, dst, true, src_coast, Some(c)))
            .collect()
    }

    /// Returns all areas a unit at `id`/`coast` can move to, in id order.
    pub fn neighbours(&self, id: AreaId, coast: Option<Coast>, fleet: bool) -> Vec<AreaId> {
        self.borders(id)
            .iter()
            .copied()
            .filter(|&n| self.is_adjacent(id, n, fleet, coast, None))
            .collect()
    }

    /// Returns the controlling area of the strait between `a` and `b`, if any.
    pub fn strait_controller(&self, a: AreaId, b: AreaId) -> Option<AreaId> {
        self.straits
            .iter()
            .find(|s| s.ends == (a, b) || s.ends == (b, a))
            .map(|s| s.controller)
    }
}

#[cfg(test)]
mod tests {
    use crate::board::maps::tuscany;
    use crate::board::{AreaId, Board, Coast};

    fn id(board: &Board, code: &str) -> AreaId {
        board.find(code).unwrap()
    }

    #[test]
    fn army_cannot_enter_sea_or_lagoon() {
        let b = tuscany().unwrap();
        assert!(b.is_adjacent(id(&b, "PIS"), id(&b, "FLO"), false, None, None));
        assert!(!b.is_adjacent(id(&b, "PIS"), id(&b, "LIG"), false, None, None));
        assert!(!b.is_adjacent(id(&b, "PAD"), id(&b, "VEN"), false, None, None));
        assert!(b.is_adjacent(id(&b, "VEN"), id(&b, "PAD"), false, None, None));
    }

    #[test]
    fn fleet_needs_sea_or_coast_on_both_ends() {
        let b = tuscany().unwrap();
        assert!(b.is_adjacent(id(&b, "LIG"), id(&b, "PIS"), true, None, None));
        assert!(b.is_adjacent(id(&b, "LUC"), id(&b, "PIS"), true, None, None));
        assert!(!b.is_adjacent(id(&b, "PIS"), id(&b, "FLO"), true, None, None));
        assert!(b.is_adjacent(id(&b, "UA"), id(&b, "VEN"), true, None, None));
    }

    #[test]
    fn non_bordering_areas_are_never_adjacent() {
        let b = tuscany().unwrap();
        assert!(!b.is_adjacent(id(&b, "LIG"), id(&b, "GON"), true, None, None));
        assert!(!b.is_adjacent(id(&b, "GEN"), id(&b, "ROM"), false, None, None));
    }

    #[test]
    fn fleet_barrier_blocks_only_fleets() {
        let b = tuscany().unwrap();
        let (rom, cap) = (id(&b, "ROM"), id(&b, "CAP"));
        assert!(!b.is_adjacent(rom, cap, true, None, None));
        assert!(!b.is_adjacent(cap, rom, true, None, None));
        assert!(b.is_adjacent(rom, cap, false, None, None));
    }

    #[test]
    fn split_coast_narrows_fleet_adjacency() {
        let b = tuscany().unwrap();
        let (cro, ua, la) = (id(&b, "CRO"), id(&b, "UA"), id(&b, "LA"));
        assert!(b.is_adjacent(ua, cro, true, None, Some(Coast::North)));
        assert!(!b.is_adjacent(ua, cro, true, None, Some(Coast::South)));
        assert!(b.is_adjacent(cro, la, true, Some(Coast::South), None));
        assert!(!b.is_adjacent(cro, la, true, Some(Coast::North), None));
        // Without a coast the province-level border decides.
        assert!(b.is_adjacent(ua, cro, true, None, None));
        assert_eq!(b.fleet_coasts_to(ua, None, cro), vec![Coast::North]);
        assert_eq!(b.fleet_coasts_to(la, None, cro), vec![Coast::South]);
    }

    #[test]
    fn unknown_coast_fails_closed() {
        let b = tuscany().unwrap();
        let (cro, ua, pis, lig) = (id(&b, "CRO"), id(&b, "UA"), id(&b, "PIS"), id(&b, "LIG"));
        assert!(!b.is_adjacent(ua, cro, true, None, Some(Coast::East)));
        assert!(!b.is_adjacent(lig, pis, true, None, Some(Coast::North)));
    }

    #[test]
    fn neighbours_by_unit_kind() {
        let b = tuscany().unwrap();
        let pio = id(&b, "PIO");
        let army: Vec<&str> = b.neighbours(pio, None, false).iter().map(|&a| b.code(a)).collect();
        assert_eq!(army.len(), 4);
        assert!(army.contains(&"SIE") && army.contains(&"ELB"));
        assert!(!army.contains(&"TYS"));
        let fleet: Vec<&str> = b.neighbours(pio, None, true).iter().map(|&a| b.code(a)).collect();
        assert!(fleet.contains(&"TYS") && fleet.contains(&"ELB"));
        assert!(!fleet.contains(&"SIE"));
    }

    #[test]
    fn strait_lookup_is_symmetric() {
        let b = tuscany().unwrap();
        let (pio, elb, tys) = (id(&b, "PIO"), id(&b, "ELB"), id(&b, "TYS"));
        assert_eq!(b.strait_controller(pio, elb), Some(tys));
        assert_eq!(b.strait_controller(elb, pio), Some(tys));
        assert_eq!(b.strait_controller(pio, tys), None);
    }
}
