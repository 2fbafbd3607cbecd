use chrono::{DateTime, Utc};
use kdl_engine::{commit_at, format_number, Campaign, CampaignKind, Stance, Tier};

fn stamp() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

#[test]
fn number_formatting() {
    assert_eq!(format_number(94.0, 1), "94");
    assert_eq!(format_number(73.6, 1), "73.6");
    assert_eq!(format_number(73.60000000000001, 1), "73.6");
    assert_eq!(format_number(99.96, 1), "100");
    assert_eq!(format_number(-0.01, 1), "0");
    assert_eq!(format_number(17.5, 0), "18");
    assert_eq!(format_number(f64::NAN, 1), "-");
}

#[test]
fn sealed_victory_entry() {
    let mut c = Campaign::default_for(CampaignKind::First);
    commit_at(&mut c, Tier::R, stamp()).unwrap();

    insta::assert_snapshot!(c.battle_log[0].to_string(), @r"
    [#1] 2023-11-14 22:13:20 UTC
    Enemy: R HP=50 progress +5
    Ability: Tough (sealed)
    Roster: Chtholly(Main) Nephren(Assist) Ithea(Assist)
    Result: rounds=3, mana spent=20, erosion +0, progress -> 5/100
    Remaining HP: 0
    Mana left: 94/89/97
    ");
}

#[test]
fn forced_stop_entry() {
    let mut c = Campaign::default_for(CampaignKind::First);
    c.set_mana("c1-m1", 0.0).unwrap();
    c.set_stance("c1-m2", Stance::Standby).unwrap();
    c.set_stance("c1-m3", Stance::Standby).unwrap();
    commit_at(&mut c, Tier::UR, stamp()).unwrap();

    insta::assert_snapshot!(c.battle_log[0].to_string(), @r"
    [#1] 2023-11-14 22:13:20 UTC
    Enemy: UR HP=200 progress +20
    Ability: Tough
    Roster: Chtholly(Main) Nephren(Standby) Ithea(Standby)
    Result: rounds=101, mana spent=0, erosion +202, progress -> 0/100
    Ended: a single member's erosion rose above 200, forced stop
    Remaining HP: 10
    Mana left: 0/100/100
    ");
}
