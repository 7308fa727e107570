//! Record mutation helpers: create, update and soft delete.
//!
//! # Responsibility
//! - Create records from whitelisted payload fields.
//! - Locate one record through a `RecordFinder` and apply a partial update.
//! - Soft delete by layering `removed`/`removed_at` over the update path.
//!
//! # Invariants
//! - Only whitelisted fields are ever assigned; other payload keys are ignored.
//! - A record that was not found is never mutated nor registered.
//! - A payload that fails to apply leaves the record untouched.
//! - Soft delete only takes effect when the whitelist holds `removed` and
//!   `removed_at`; otherwise the call succeeds without visible removal.
//! - Caller payloads are never mutated.

use crate::model::field::{FieldWhitelist, Model, REMOVED_AT_FIELD, REMOVED_FIELD};
use crate::model::value::FieldValue;
use crate::query::filter::FilterSpec;
use crate::query::payload::Payload;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::finder::RecordFinder;
use crate::repo::session::Session;
use chrono::Utc;
use log::{info, warn};

/// Generic create/update/soft-delete helper bound to one session.
pub struct RecordMutator<S: Session> {
    session: S,
}

impl<S: Session> RecordMutator<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Mutable session access, e.g. to commit pending writes.
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Creates a transient record and registers it for save.
    ///
    /// Whitelisted fields missing from `data` keep their `Default` value.
    ///
    /// # Errors
    /// - `RepoError::Field` when a whitelisted value does not fit its field.
    /// - Session registration errors, unchanged.
    pub fn create<M: Model>(
        &mut self,
        fields: &FieldWhitelist<M>,
        data: &Payload,
    ) -> RepoResult<M> {
        let mut record = M::default();
        let applied = apply_payload(&mut record, fields, data)?;
        self.session.register_for_save(&record)?;

        info!(
            "event=record_create module=service status=ok table={} applied_fields={} ignored_fields={}",
            M::table(),
            applied.len(),
            data.len() - applied.len()
        );
        Ok(record)
    }

    /// Updates the record whose `id` equals `id`.
    ///
    /// Same as `update_by_params` with `[{"id": {"$eq": id}}]`.
    pub fn update_by_id<M, F>(
        &mut self,
        finder: &F,
        fields: &FieldWhitelist<M>,
        id: impl Into<FieldValue>,
        data: &Payload,
    ) -> RepoResult<M>
    where
        M: Model,
        F: RecordFinder<S>,
    {
        self.update_by_params(finder, fields, &FilterSpec::by_id(id), data)
    }

    /// Locates one record with `filter` and applies whitelisted `data` to it.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `finder` returns nothing; nothing is
    ///   registered in that case.
    /// - `RepoError::Field` when a whitelisted value does not fit its field.
    /// - Finder and session errors, unchanged.
    pub fn update_by_params<M, F>(
        &mut self,
        finder: &F,
        fields: &FieldWhitelist<M>,
        filter: &FilterSpec,
        data: &Payload,
    ) -> RepoResult<M>
    where
        M: Model,
        F: RecordFinder<S>,
    {
        let Some(mut record) = finder.find::<M>(&self.session, filter)? else {
            info!(
                "event=record_update module=service status=not_found table={} clauses={}",
                M::table(),
                filter.clauses().count()
            );
            return Err(RepoError::NotFound {
                table: M::table(),
                filter: filter.clone(),
            });
        };

        let applied = apply_payload(&mut record, fields, data)?;
        self.session.register_for_save(&record)?;

        info!(
            "event=record_update module=service status=ok table={} applied_fields={} ignored_fields={}",
            M::table(),
            applied.len(),
            data.len() - applied.len()
        );
        Ok(record)
    }

    /// Soft deletes the record whose `id` equals `id`.
    ///
    /// Same as `delete_by_params` with `[{"id": {"$eq": id}}]`.
    pub fn delete_by_id<M, F>(
        &mut self,
        finder: &F,
        fields: &FieldWhitelist<M>,
        id: impl Into<FieldValue>,
        extra_data: Option<&Payload>,
    ) -> RepoResult<M>
    where
        M: Model,
        F: RecordFinder<S>,
    {
        self.delete_by_params(finder, fields, &FilterSpec::by_id(id), extra_data)
    }

    /// Soft deletes one record located with `filter`.
    ///
    /// Applies `extra_data` with `removed=true` and `removed_at=<now, UTC ms>`
    /// laid over it. `fields` must include `removed` and `removed_at` for the
    /// removal to be visible; see `FieldWhitelist::with_soft_delete`.
    ///
    /// # Errors
    /// - Same as `update_by_params`.
    pub fn delete_by_params<M, F>(
        &mut self,
        finder: &F,
        fields: &FieldWhitelist<M>,
        filter: &FilterSpec,
        extra_data: Option<&Payload>,
    ) -> RepoResult<M>
    where
        M: Model,
        F: RecordFinder<S>,
    {
        if !fields.covers_soft_delete() {
            warn!(
                "event=record_delete module=service status=degraded table={} reason=whitelist_missing_soft_delete_fields",
                M::table()
            );
        }

        let payload = soft_delete_payload(extra_data, now_epoch_ms());
        let record = self.update_by_params(finder, fields, filter, &payload)?;

        info!(
            "event=record_delete module=service status=ok table={} extra_fields={}",
            M::table(),
            extra_data.map_or(0, Payload::len)
        );
        Ok(record)
    }
}

/// Assigns every whitelisted field present in `data` onto `record`.
///
/// Returns the assigned field names in whitelist order. On error `record`
/// is left exactly as it was.
pub fn apply_payload<M: Model>(
    record: &mut M,
    fields: &FieldWhitelist<M>,
    data: &Payload,
) -> RepoResult<Vec<&'static str>> {
    let mut staged = record.clone();
    let mut applied = Vec::new();

    for field in fields.fields() {
        if let Some(value) = data.get(field) {
            staged.set(field, value.clone())?;
            applied.push(*field);
        }
    }

    *record = staged;
    Ok(applied)
}

/// Builds the soft-delete payload: `extra` with removal keys laid over it.
///
/// `removed` and `removed_at` always win over same-named keys in `extra`.
pub fn soft_delete_payload(extra: Option<&Payload>, removed_at_ms: i64) -> Payload {
    let removal = Payload::new()
        .with(REMOVED_FIELD, true)
        .with(REMOVED_AT_FIELD, removed_at_ms);

    match extra {
        Some(extra) => extra.merged_with(&removal),
        None => removal,
    }
}

/// Current UTC time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::{apply_payload, now_epoch_ms, soft_delete_payload, RecordMutator};
    use crate::model::contact::Contact;
    use crate::model::field::{FieldWhitelist, Model};
    use crate::model::value::FieldValue;
    use crate::query::filter::{FilterEntry, FilterOp, FilterSpec};
    use crate::query::payload::Payload;
    use crate::repo::error::{RepoError, RepoResult};
    use crate::repo::finder::RecordFinder;
    use crate::repo::session::Session;
    use std::cell::RefCell;

    /// Session that records what was registered.
    #[derive(Default)]
    struct RecordingSession {
        saved: Vec<Vec<(&'static str, FieldValue)>>,
    }

    impl Session for RecordingSession {
        fn register_for_save<M: Model>(&mut self, record: &M) -> RepoResult<()> {
            let snapshot = M::columns()
                .iter()
                .map(|column| (*column, record.get(column).unwrap_or(FieldValue::Null)))
                .collect();
            self.saved.push(snapshot);
            Ok(())
        }
    }

    /// Finder returning a fixed contact and remembering the filters it saw.
    struct StubFinder {
        found: Option<Contact>,
        seen: RefCell<Vec<FilterSpec>>,
    }

    impl StubFinder {
        fn returning(found: Option<Contact>) -> Self {
            Self {
                found,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RecordFinder<RecordingSession> for StubFinder {
        fn find<M: Model>(
            &self,
            _session: &RecordingSession,
            filter: &FilterSpec,
        ) -> RepoResult<Option<M>> {
            self.seen.borrow_mut().push(filter.clone());
            let Some(contact) = self.found.as_ref() else {
                return Ok(None);
            };
            let mut record = M::default();
            for column in Contact::columns() {
                let value = contact.get(column).unwrap_or(FieldValue::Null);
                record.set(column, value)?;
            }
            Ok(Some(record))
        }
    }

    fn existing_contact() -> Contact {
        Contact {
            id: Some(7),
            name: "a".to_string(),
            email: Some("a@example.com".to_string()),
            ..Contact::default()
        }
    }

    fn soft_delete_whitelist() -> FieldWhitelist<Contact> {
        FieldWhitelist::new(["name", "removed", "removed_at"]).unwrap()
    }

    #[test]
    fn create_sets_present_fields_and_defaults_the_rest() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let fields = FieldWhitelist::<Contact>::new(["name", "email", "phone"]).unwrap();
        let data = Payload::new()
            .with("name", "ada")
            .with("email", "ada@example.com")
            .with("removed", true);

        let contact = mutator.create(&fields, &data).unwrap();

        assert_eq!(contact.name, "ada");
        assert_eq!(contact.email.as_deref(), Some("ada@example.com"));
        assert_eq!(contact.phone, None);
        assert!(!contact.removed, "unlisted field must be ignored");
        assert_eq!(contact.id, None);
        assert_eq!(mutator.session().saved.len(), 1);
    }

    #[test]
    fn create_with_ill_typed_value_registers_nothing() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let fields = FieldWhitelist::<Contact>::new(["name"]).unwrap();
        let data = Payload::new().with("name", 5_i64);

        let err = mutator.create(&fields, &data).unwrap_err();

        assert!(matches!(err, RepoError::Field(_)));
        assert!(mutator.session().saved.is_empty());
    }

    #[test]
    fn update_applies_only_whitelisted_fields() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let finder = StubFinder::returning(Some(existing_contact()));
        let fields = FieldWhitelist::<Contact>::new(["phone"]).unwrap();
        let data = Payload::new().with("phone", "555").with("name", "b");

        let filter = FilterSpec::eq("email", "a@example.com");
        let contact = mutator
            .update_by_params(&finder, &fields, &filter, &data)
            .unwrap();

        assert_eq!(contact.phone.as_deref(), Some("555"));
        assert_eq!(contact.name, "a");
        assert_eq!(mutator.session().saved.len(), 1);
    }

    #[test]
    fn update_by_id_matches_update_by_params_with_id_filter() {
        let fields = FieldWhitelist::<Contact>::new(["name"]).unwrap();
        let data = Payload::new().with("name", "b");

        let by_id_finder = StubFinder::returning(Some(existing_contact()));
        let mut by_id = RecordMutator::new(RecordingSession::default());
        let via_id = by_id.update_by_id(&by_id_finder, &fields, 7_i64, &data).unwrap();

        let by_params_finder = StubFinder::returning(Some(existing_contact()));
        let mut by_params = RecordMutator::new(RecordingSession::default());
        let explicit =
            FilterSpec::new().entry(FilterEntry::new().with("id", FilterOp::Eq, 7_i64));
        let via_params = by_params
            .update_by_params(&by_params_finder, &fields, &explicit, &data)
            .unwrap();

        assert_eq!(via_id, via_params);
        assert_eq!(*by_id_finder.seen.borrow(), *by_params_finder.seen.borrow());
        assert_eq!(by_id.session().saved, by_params.session().saved);
    }

    #[test]
    fn update_of_missing_record_is_not_found_and_registers_nothing() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let finder = StubFinder::returning(None);
        let fields = FieldWhitelist::<Contact>::all();

        let err = mutator
            .update_by_id(&finder, &fields, 99_i64, &Payload::new().with("name", "x"))
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            RepoError::NotFound { table, filter } => {
                assert_eq!(table, "contacts");
                assert_eq!(filter, FilterSpec::by_id(99_i64));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(mutator.session().saved.is_empty());
    }

    #[test]
    fn delete_by_id_marks_removed_and_stamps_call_time() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let finder = StubFinder::returning(Some(existing_contact()));

        let before = now_epoch_ms();
        let contact = mutator
            .delete_by_id(&finder, &soft_delete_whitelist(), 7_i64, None)
            .unwrap();
        let after = now_epoch_ms();

        assert_eq!(contact.name, "a");
        assert!(contact.removed);
        let removed_at = contact.removed_at.expect("removed_at should be stamped");
        assert!(before <= removed_at && removed_at <= after);
        assert_eq!(*finder.seen.borrow(), vec![FilterSpec::by_id(7_i64)]);
    }

    #[test]
    fn delete_without_soft_delete_fields_succeeds_without_visible_change() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let finder = StubFinder::returning(Some(existing_contact()));
        let fields = FieldWhitelist::<Contact>::new(["name"]).unwrap();

        let contact = mutator.delete_by_id(&finder, &fields, 7_i64, None).unwrap();

        assert_eq!(contact, existing_contact());
        assert_eq!(mutator.session().saved.len(), 1);
    }

    #[test]
    fn delete_extra_data_cannot_override_removal() {
        let mut mutator = RecordMutator::new(RecordingSession::default());
        let finder = StubFinder::returning(Some(existing_contact()));
        let fields = FieldWhitelist::<Contact>::new(["phone"])
            .unwrap()
            .with_soft_delete()
            .unwrap();
        let extra = Payload::new().with("removed", false).with("phone", "x");

        let contact = mutator
            .delete_by_id(&finder, &fields, 7_i64, Some(&extra))
            .unwrap();

        assert!(contact.removed);
        assert_eq!(contact.phone.as_deref(), Some("x"));
        assert_eq!(extra.get("removed"), Some(&FieldValue::Bool(false)));
        assert!(!extra.contains_key("removed_at"));
    }

    #[test]
    fn soft_delete_payload_without_extra_is_exactly_the_removal_pair() {
        let payload = soft_delete_payload(None, 1_700_000_000_000);
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(keys, vec!["removed", "removed_at"]);
        assert_eq!(payload.get("removed"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            payload.get("removed_at"),
            Some(&FieldValue::Integer(1_700_000_000_000))
        );
    }

    #[test]
    fn soft_delete_payload_keeps_extra_keys_and_overrides_removal() {
        let extra = Payload::new().with("removed", false).with("note", "x");
        let payload = soft_delete_payload(Some(&extra), 5);
        assert_eq!(payload.get("removed"), Some(&FieldValue::Bool(true)));
        assert_eq!(payload.get("removed_at"), Some(&FieldValue::Integer(5)));
        assert_eq!(payload.get("note"), Some(&FieldValue::from("x")));
    }

    #[test]
    fn apply_payload_is_all_or_nothing() {
        let mut contact = existing_contact();
        let fields = FieldWhitelist::<Contact>::new(["name", "phone"]).unwrap();
        let data = Payload::new().with("name", "b").with("phone", 1_i64);

        assert!(apply_payload(&mut contact, &fields, &data).is_err());
        assert_eq!(contact, existing_contact());
    }
}
