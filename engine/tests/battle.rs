use kdl_engine::{
    commit, forecast, modifiers, BattleError, Campaign, CampaignKind, EnemyAbility, EnemyEffects,
    Stance, Tier, EROSION_STOP_THRESHOLD,
};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn stances(c: &Campaign) -> Vec<Stance> {
    c.roster.iter().map(|m| m.stance).collect()
}

fn mana(c: &Campaign) -> Vec<f64> {
    c.roster.iter().map(|m| m.mana_pool).collect()
}

#[test]
fn sealed_opening_strike_fight() {
    let mut c = Campaign::default_for(CampaignKind::First);
    let out = commit(&mut c, Tier::R).unwrap();

    assert!(out.victory());
    assert!(out.sealed);
    assert_eq!(out.ability_label.as_deref(), Some("Tough"));
    assert_eq!(out.rounds_elapsed, 3);
    assert_eq!(out.mana_spent, 20.0);
    assert_eq!(out.erosion_gained, 0.0);
    assert_eq!(out.remaining_hp, 0.0);
    assert_eq!(out.progress_gain, 5.0);
    assert_eq!(mana(&c), vec![94.0, 89.0, 97.0]);
    assert_eq!(c.progress, 5.0);

    // strike leaves 20 HP; 7 damage a round from there
    let hp: Vec<f64> = out.round_log.iter().map(|r| r.enemy_hp).collect();
    assert_eq!(hp, vec![13.0, 6.0, 0.0]);
}

#[test]
fn tough_trims_every_hit() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_stance("c1-m2", Stance::Standby).unwrap();
    let out = forecast(&c, Tier::R).unwrap();

    assert!(!out.sealed);
    // 3 + 2 per round, each less one
    assert_eq!(out.rounds_elapsed, 7);
    assert!(out.victory());
}

#[test]
fn regen_heals_between_rounds() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_stance("c1-m2", Stance::Standby).unwrap();
    c.set_ability(Tier::R, 0, Some(EnemyAbility::Regen)).unwrap();
    let out = forecast(&c, Tier::R).unwrap();

    assert_eq!(out.rounds_elapsed, 6);
    assert_eq!(out.round_log[0].enemy_hp, 17.0);
    assert_eq!(out.round_log[5].enemy_hp, 0.0);
}

#[test]
fn drain_taxes_active_members_only() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_stance("c1-m2", Stance::Standby).unwrap();
    c.set_mana("c1-m2", 40.0).unwrap();
    c.set_ability(Tier::R, 0, Some(EnemyAbility::Drain)).unwrap();
    let out = commit(&mut c, Tier::R).unwrap();

    assert_eq!(out.rounds_elapsed, 4);
    assert_eq!(out.member("c1-m1").unwrap().spent_mana, 10.0);
    assert_eq!(out.member("c1-m3").unwrap().spent_mana, 6.0);
    // standby recovers the tier reward
    assert_eq!(mana(&c), vec![90.0, 45.0, 94.0]);
}

#[test]
fn giant_inflates_hp_unless_sealed() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_ability(Tier::SR, 0, Some(EnemyAbility::Giant)).unwrap();
    let sealed = forecast(&c, Tier::SR).unwrap();
    assert_eq!(sealed.enemy_effective_max_hp, 90.0);

    c.set_stance("c1-m2", Stance::Standby).unwrap();
    let open = forecast(&c, Tier::SR).unwrap();
    assert!(close(open.enemy_effective_max_hp, 117.0));
}

#[test]
fn standby_recovery_after_victory() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_stance("c1-m3", Stance::Standby).unwrap();
    c.set_mana("c1-m3", 90.0).unwrap();
    let out = commit(&mut c, Tier::SR).unwrap();

    assert_eq!(out.rounds_elapsed, 10);
    assert_eq!(mana(&c), vec![80.0, 80.0, 100.0]);
    assert_eq!(out.member("c1-m3").unwrap().mana_after, 100.0);
    assert_eq!(c.progress, 10.0);
    // 20 + 20 spent, 10 recovered
    assert!(close(out.net_cost(), 30.0));
    assert_eq!(out.cost_per_progress(), Some(3.0));
}

#[test]
fn runaway_erosion_forces_a_stop() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_mana("c1-m1", 0.0).unwrap();
    c.set_mana("c1-m2", 50.0).unwrap();
    c.set_stance("c1-m2", Stance::Standby).unwrap();
    c.set_stance("c1-m3", Stance::Standby).unwrap();
    let out = commit(&mut c, Tier::UR).unwrap();

    assert!(out.forced_stop);
    assert!(!out.victory());
    assert_eq!(out.rounds_elapsed, 101);
    assert_eq!(out.erosion_gained, 202.0);
    assert!(out.erosion_gained > EROSION_STOP_THRESHOLD);
    assert_eq!(out.remaining_hp, 10.0);
    assert_eq!(out.progress_gain, 0.0);

    // no reward, no recovery, but the erosion stands
    assert_eq!(c.progress, 0.0);
    assert_eq!(c.erosion_debt, 202.0);
    assert_eq!(mana(&c), vec![0.0, 50.0, 100.0]);
    assert!(c.battle_log[0].forced_stop);
}

#[test]
fn inspired_main_erodes_at_half_rate() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_stance("c1-m2", Stance::Main).unwrap();
    c.set_stance("c1-m1", Stance::Standby).unwrap();
    c.set_mana("c1-m2", 0.0).unwrap();
    let out = forecast(&c, Tier::R).unwrap();

    // discounted cost 1.2 unpaid, scaled back to 2, halved
    assert!(close(out.round_log[0].erosion[1], 1.0));
    assert_eq!(out.round_log[0].erosion[2], 0.0);
    assert!(out.erosion_gained > 0.0);
}

#[test]
fn hard_enemy_only_feels_the_main() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    let out = commit(&mut c, Tier::SR).unwrap();

    assert_eq!(out.ability_label.as_deref(), Some("Hard"));
    assert_eq!(out.rounds_elapsed, 45);
    assert!(close(out.member("c2-m1").unwrap().spent_mana, 54.0));
    // the killing blow lands before either assist pays for round 45
    assert!(close(out.member("c2-m2").unwrap().spent_mana, 26.4));
    assert!(close(out.member("c2-m3").unwrap().spent_mana, 26.4));
    assert_eq!(c.progress, 10.0);
    assert_eq!(c.last_defeated_tier, Some(Tier::SR));
}

#[test]
fn last_word_and_stun() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_ability(Tier::SR, 1, Some(EnemyAbility::LastWord)).unwrap();
    c.set_stance("c2-m3", Stance::Standby).unwrap();
    c.set_mana("c2-m3", 50.0).unwrap();
    let plain = forecast(&c, Tier::SR).unwrap();

    assert_eq!(plain.ability_label.as_deref(), Some("Hard+Last Word"));
    // 54 for the fight, 10 for the last word, no erosion from it
    assert!(close(plain.member("c2-m1").unwrap().mana_after, 36.0));
    assert_eq!(plain.erosion_gained, 0.0);
    assert_eq!(plain.member("c2-m3").unwrap().mana_after, 60.0);

    c.set_ability(Tier::SR, 1, Some(EnemyAbility::Stun)).unwrap();
    let stunned = forecast(&c, Tier::SR).unwrap();
    assert_eq!(stunned.member("c2-m3").unwrap().mana_after, 50.0);
}

#[test]
fn follow_ups_and_missing_hp_bonus() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_ability(Tier::SR, 0, Some(EnemyAbility::Spore)).unwrap();
    let out = forecast(&c, Tier::SR).unwrap();

    // 2 + 0.8, then 2 + 0.8 + 0.1 + 0.04
    assert!(close(out.round_log[0].enemy_hp, 84.26));
    assert!(out.victory());
}

#[test]
fn seal_suppresses_hard_and_last_word() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_stance("c2-m3", Stance::Main).unwrap();
    c.set_ability(Tier::SR, 1, Some(EnemyAbility::LastWord)).unwrap();
    assert_eq!(stances(&c), vec![Stance::Assist, Stance::Assist, Stance::Main]);

    let mods = modifiers::resolve(&c, Tier::SR).unwrap();
    assert!(mods.sealed);
    assert_eq!(mods.effects, EnemyEffects::default());
    assert_eq!(mods.selected, vec![EnemyAbility::Hard, EnemyAbility::LastWord]);

    let out = commit(&mut c, Tier::SR).unwrap();
    assert_eq!(out.ability_label.as_deref(), Some("Hard+Last Word"));
    // both hitters land 2 and a 0.8 follow-up
    assert!(close(out.round_log[0].enemy_hp, 84.4));
    assert_eq!(out.rounds_elapsed, 17);
    assert_eq!(out.member("c2-m1").unwrap().spent_mana, 27.0);
    assert_eq!(out.member("c2-m2").unwrap().spent_mana, 16.0);
    // no last-word charge on the Main
    assert_eq!(out.member("c2-m3").unwrap().mana_after, 68.0);

    // benching the sealer lets hard through: only the Main's bare hit lands
    let mut open = Campaign::default_for(CampaignKind::Second);
    open.set_stance("c2-m3", Stance::Main).unwrap();
    open.set_stance("c2-m1", Stance::Standby).unwrap();
    let out = forecast(&open, Tier::SR).unwrap();
    assert!(!out.sealed);
    assert_eq!(out.round_log[0].enemy_hp, 88.0);
}

#[test]
fn seal_suppresses_stun() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_stance("c2-m2", Stance::Main).unwrap();
    c.set_stance("c2-m3", Stance::Standby).unwrap();
    c.set_mana("c2-m3", 50.0).unwrap();
    c.set_ability(Tier::SR, 1, Some(EnemyAbility::Stun)).unwrap();

    let mods = modifiers::resolve(&c, Tier::SR).unwrap();
    assert_eq!(mods.effects, EnemyEffects::default());
    assert_eq!(mods.selected, vec![EnemyAbility::Hard, EnemyAbility::Stun]);

    let out = commit(&mut c, Tier::SR).unwrap();
    // 2 from the sealer, 4 from the Main on its streak
    assert_eq!(out.rounds_elapsed, 15);
    assert!(out.victory());
    assert_eq!(out.member("c2-m3").unwrap().mana_after, 60.0);
    assert_eq!(c.roster[2].mana_pool, 60.0);
}

#[test]
fn streak_discount_for_rhantolk_main() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_stance("c2-m2", Stance::Main).unwrap();
    c.set_stance("c2-m1", Stance::Standby).unwrap();
    c.set_stance("c2-m3", Stance::Standby).unwrap();

    let on_streak = forecast(&c, Tier::SR).unwrap();
    // 4 damage against 90 HP, 1.6 mana a round
    assert_eq!(on_streak.rounds_elapsed, 23);
    assert!(close(on_streak.mana_spent, 23.0 * 1.6));

    // no bonus off the streak: 2 a round at full cost, the last 20 rounds unpaid
    let cold = forecast(&c, Tier::SSR).unwrap();
    assert_eq!(cold.rounds_elapsed, 70);
    assert_eq!(cold.mana_spent, 100.0);
    assert_eq!(cold.erosion_gained, 40.0);
}

#[test]
fn streak_reference_needs_rhantolk_in_the_fight() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    c.set_stance("c2-m2", Stance::Standby).unwrap();
    commit(&mut c, Tier::UR).unwrap();
    assert_eq!(c.last_defeated_tier, Some(Tier::SR));

    c.set_stance("c2-m2", Stance::Assist).unwrap();
    for id in ["c2-m1", "c2-m2", "c2-m3"] {
        c.set_mana(id, 100.0).unwrap();
    }
    commit(&mut c, Tier::UR).unwrap();
    assert_eq!(c.last_defeated_tier, Some(Tier::UR));
}

#[test]
fn progress_is_clamped_at_100() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.progress = 98.0;
    let preview = forecast(&c, Tier::R).unwrap();
    assert_eq!(preview.progress_gain, 2.0);

    let out = commit(&mut c, Tier::R).unwrap();
    assert_eq!(out.progress_gain, 2.0);
    assert_eq!(c.progress, 100.0);
}

#[test]
fn invalid_formation_is_rejected_without_side_effects() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.roster[1].stance = Stance::Main;
    let before = c.clone();

    assert_eq!(commit(&mut c, Tier::R), Err(BattleError::InvalidFormation { mains: 2 }));
    assert_eq!(c, before);

    for m in &mut c.roster {
        m.stance = Stance::Standby;
    }
    let before = c.clone();
    assert_eq!(commit(&mut c, Tier::R), Err(BattleError::NoActiveMembers));
    assert_eq!(c, before);
}

#[test]
fn disallowed_tier_is_an_invalid_enemy() {
    let mut c = Campaign::default_for(CampaignKind::Second);
    let before = c.clone();
    assert_eq!(
        commit(&mut c, Tier::R),
        Err(BattleError::InvalidEnemy("R".to_string()))
    );
    assert_eq!(forecast(&c, Tier::R), Err(BattleError::InvalidEnemy("R".to_string())));
    assert_eq!(c, before);
}
