use super::model::Event;

/// Content equality over the fields an importer copies verbatim.
pub fn looks_same(a: &Event, b: &Event) -> bool {
    a.name == b.name
        && a.description == b.description
        && a.description_format == b.description_format
        && a.start_time == b.start_time
        && a.duration == b.duration
        && a.priority == b.priority
        && a.location == b.location
}

/// Same subscription, or same owning category/course/group/user.
pub fn same_calendar(a: &Event, b: &Event) -> bool {
    if a.import_source_id == b.import_source_id {
        return true;
    }
    a.category_id == b.category_id
        && a.course_id == b.course_id
        && a.group_id == b.group_id
        && a.user_id == b.user_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Event {
        let mut e = Event::new(1, "Lecture");
        e.description = "<p>Room change</p>".into();
        e.start_time = 1_700_000_000;
        e.duration = 3600;
        e.priority = Some(0);
        e.location = "B12".into();
        e.import_source_id = Some(4);
        e.course_id = 9;
        e.user_id = 3;
        e
    }

    #[test]
    fn each_content_field_breaks_equality() {
        let a = base();
        let mutations: [fn(&mut Event); 7] = [
            |e| e.name.push('!'),
            |e| e.description.clear(),
            |e| e.description_format = 2,
            |e| e.start_time += 1,
            |e| e.duration = 0,
            |e| e.priority = None,
            |e| e.location = "B13".into(),
        ];
        assert!(looks_same(&a, &base()));
        for mutate in mutations {
            let mut b = base();
            mutate(&mut b);
            assert!(!looks_same(&a, &b), "mutation left records equal: {b:?}");
        }
    }

    #[test]
    fn unlisted_fields_do_not_affect_content_equality() {
        let a = base();
        let mut b = base();
        b.id = 77;
        b.reference = "1@host".into();
        b.import_source_id = None;
        b.course_id = 10;
        b.user_id = 0;
        assert!(looks_same(&a, &b));
    }

    #[test]
    fn shared_import_source_ignores_owner_keys() {
        let a = base();
        let mut b = base();
        b.category_id = 5;
        b.course_id = 6;
        b.group_id = 7;
        b.user_id = 8;
        assert!(same_calendar(&a, &b));

        let mut organic_a = base();
        let mut organic_b = b.clone();
        organic_a.import_source_id = None;
        organic_b.import_source_id = None;
        assert!(same_calendar(&organic_a, &organic_b));
    }

    #[test]
    fn different_import_source_falls_back_to_owner_keys() {
        let a = base();
        let mut b = base();
        b.import_source_id = Some(5);
        assert!(same_calendar(&a, &b));

        let owner_changes: [fn(&mut Event); 4] = [
            |e| e.category_id = 1,
            |e| e.course_id = 1,
            |e| e.group_id = 1,
            |e| e.user_id = 1,
        ];
        for change in owner_changes {
            let mut c = b.clone();
            change(&mut c);
            assert!(!same_calendar(&a, &c));
        }
    }
}
