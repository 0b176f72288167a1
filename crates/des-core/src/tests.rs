//! Unit tests for des-core primitives.

#[cfg(test)]
mod ids {
    use crate::{ElementId, EntityId, ResourceId, WorkItemId};

    #[test]
    fn index_roundtrip() {
        let id = ElementId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(ElementId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(WorkItemId(0) < WorkItemId(1));
        assert!(ResourceId(100) > ResourceId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(ElementId::INVALID.0, u32::MAX);
        assert_eq!(WorkItemId::INVALID.0, u64::MAX);
        assert_eq!(ResourceId::default(), ResourceId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(ElementId(7).to_string(), "ElementId(7)");
        assert_eq!(EntityId::Resource(ResourceId(3)).to_string(), "ResourceId(3)");
        assert_eq!(EntityId::Kernel.to_string(), "Kernel");
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, SimConfig, Tick};

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
    }

    #[test]
    fn tick_arithmetic_saturates() {
        assert_eq!(Tick::MAX + 1, Tick::MAX);
        assert_eq!(Tick(3) - Tick(10), 0);
    }

    #[test]
    fn clock_unix_secs() {
        let clock = SimClock::new(1_000, 60);
        assert_eq!(clock.unix_secs(Tick(0)), 1_000);
        assert_eq!(clock.unix_secs(Tick(10)), 1_600);
    }

    #[test]
    fn clock_dhm() {
        let clock = SimClock::new(0, 3600);
        assert_eq!(clock.elapsed_dhm(Tick(25)), (1, 1, 0));
    }

    #[test]
    fn ticks_for_duration() {
        let clock = SimClock::new(0, 3600);
        assert_eq!(clock.ticks_for_hours(24), 24);
        assert_eq!(clock.ticks_for_days(7), 168);
        // partial tick rounds up
        assert_eq!(clock.ticks_for_secs(1), 1);
    }

    #[test]
    fn sim_config_horizon() {
        let cfg = SimConfig { total_ticks: 8760, ..SimConfig::default() };
        assert_eq!(cfg.horizon(), Tick(8760));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn sim_config_rejects_zero_workers() {
        let cfg = SimConfig { num_workers: Some(0), ..SimConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig { tick_duration_secs: 0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod rng {
    use crate::{ElementId, ElementRng};

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = ElementRng::new(12345, ElementId(0));
        let mut r2 = ElementRng::new(12345, ElementId(0));
        for _ in 0..100 {
            let a: u64 = r1.gen_range(0..1_000_000);
            let b: u64 = r2.gen_range(0..1_000_000);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn different_elements_differ() {
        let mut r0 = ElementRng::new(1, ElementId(0));
        let mut r1 = ElementRng::new(1, ElementId(1));
        let a: Vec<u64> = (0..8).map(|_| r0.gen_range(0..u64::MAX)).collect();
        let b: Vec<u64> = (0..8).map(|_| r1.gen_range(0..u64::MAX)).collect();
        assert_ne!(a, b, "seeds for adjacent elements should diverge");
    }
}
