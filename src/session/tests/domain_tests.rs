//! Domain behaviour of sessions.

use crate::ids::{ProjectId, SpaceId};
use crate::session::domain::{Session, SpaceFilter};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;
use serde_json::{Map, json};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn clock_at(second: u32) -> FixedClock {
    FixedClock(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, second)
            .single()
            .expect("valid timestamp"),
    )
}

#[rstest]
fn updates_move_updated_at_but_not_created_at() {
    let mut session = Session::new(ProjectId::new(), None, Map::new(), &clock_at(0));
    let later = clock_at(30);

    let configs = json!({"mode": "chat"})
        .as_object()
        .cloned()
        .expect("object literal");
    session.update_configs(configs.clone(), &later);

    assert_eq!(session.configs(), &configs);
    assert_eq!(session.updated_at(), later.utc());
    assert!(session.created_at() < session.updated_at());
}

#[rstest]
fn connecting_sets_the_space() {
    let space = SpaceId::new();
    let mut session = Session::new(ProjectId::new(), None, Map::new(), &clock_at(0));

    session.connect_to_space(space, &clock_at(1));

    assert_eq!(session.space_id(), Some(space));
}

#[rstest]
#[case::any(SpaceFilter::Any, true, true)]
#[case::not_connected(SpaceFilter::NotConnected, false, true)]
fn filters_select_by_space(
    #[case] filter: SpaceFilter,
    #[case] connected_matches: bool,
    #[case] loose_matches: bool,
) {
    let clock = clock_at(0);
    let project = ProjectId::new();
    let connected = Session::new(project, Some(SpaceId::new()), Map::new(), &clock);
    let loose = Session::new(project, None, Map::new(), &clock);

    assert_eq!(connected.matches(filter), connected_matches);
    assert_eq!(loose.matches(filter), loose_matches);
}

#[rstest]
fn space_filter_matches_only_that_space() {
    let clock = clock_at(0);
    let space = SpaceId::new();
    let inside = Session::new(ProjectId::new(), Some(space), Map::new(), &clock);
    let elsewhere = Session::new(ProjectId::new(), Some(SpaceId::new()), Map::new(), &clock);

    assert!(inside.matches(SpaceFilter::Space(space)));
    assert!(!elsewhere.matches(SpaceFilter::Space(space)));
}
