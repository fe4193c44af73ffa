//! Tests for adaptive penalty management.

use hgs_vrptw::penalty::PenaltyManager;

fn manager(initial: i64) -> PenaltyManager {
    PenaltyManager::new(initial, initial, 1.34, 0.32, 2.5, 0.43, 12)
}

#[test]
fn zero_feasibility_drives_the_penalty_to_the_upper_clamp() {
    let mut manager = manager(100);

    let mut previous = manager.capacity_penalty();
    for _ in 0..3 {
        manager.update_capacity_penalty(0.0);
        assert!(manager.capacity_penalty() > previous || manager.capacity_penalty() == 1000);
        previous = manager.capacity_penalty();
    }

    assert_eq!(manager.capacity_penalty(), 1000);
}

#[test]
fn full_feasibility_decays_the_penalty_toward_one() {
    let mut manager = manager(100);

    let mut previous = manager.capacity_penalty();
    for _ in 0..3 {
        manager.update_capacity_penalty(1.0);
        assert!(manager.capacity_penalty() < previous);
        previous = manager.capacity_penalty();
    }

    assert!(manager.capacity_penalty() >= 1);

    // The lower clamp holds under continued pressure.
    for _ in 0..10 {
        manager.update_capacity_penalty(1.0);
    }
    assert_eq!(manager.capacity_penalty(), 1);
}

#[test]
fn on_target_feasibility_leaves_penalties_unchanged() {
    let mut manager = manager(100);

    manager.update_capacity_penalty(0.43);
    manager.update_tw_penalty(0.43);

    assert_eq!(manager.capacity_penalty(), 100);
    assert_eq!(manager.tw_penalty(), 100);
}

#[test]
fn time_warp_penalty_follows_the_same_rules() {
    let mut manager1 = manager(50);

    manager1.update_tw_penalty(0.1);
    assert!(manager1.tw_penalty() > 50);

    let mut manager2 = manager(50);
    manager2.update_tw_penalty(0.9);
    assert!(manager2.tw_penalty() < 50);
}

#[test]
fn booster_multiplies_and_restores_penalties() {
    let mut manager = manager(10);

    {
        let booster = manager.booster();
        let evaluator = booster.cost_evaluator();

        // Boosted by the repair factor of 12.
        assert_eq!(
            evaluator.load_penalty(hgs_vrptw::Load(1), hgs_vrptw::Load(0)),
            hgs_vrptw::Cost(120)
        );
        assert_eq!(
            evaluator.tw_penalty(hgs_vrptw::Duration(1)),
            hgs_vrptw::Cost(120)
        );
    }

    // Dropping the booster restores the previous coefficients.
    assert_eq!(manager.capacity_penalty(), 10);
    assert_eq!(manager.tw_penalty(), 10);
}
