//! Tag vocabulary, assignments, scrub and membership queries
//!
//! Referential rules are enforced here rather than by the storage engine:
//! a value needs its tag, an assignment needs its object and value, and
//! nothing that is referenced may be deleted.

use super::{instrumented, RepositoryManager};
use crate::membership::MembershipCache;
use crate::report::{Normalization, ScrubReport};
use crate::txn::TransactionGuard;
use cairn_core::adapter::{Backend, SortKey};
use cairn_core::errors::{RepoError, RepoErrorKind, Result};
use cairn_core::filter::{Expr, ExpressionFactory};
use cairn_core::model::{ObjectTag, Tag, TagType, TagValue};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Canonical spelling of a Sequence value
///
/// Surrounding whitespace goes and every dot-separated numeric component
/// loses its leading zeros: ` 01.002.0 ` becomes `1.2.0`.
pub(crate) fn canonical_sequence(value: &str) -> String {
    value
        .trim()
        .split('.')
        .map(|part| {
            let part = part.trim();
            if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                let stripped = part.trim_start_matches('0');
                if stripped.is_empty() {
                    "0"
                } else {
                    stripped
                }
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn no_such_tag(op: &str, name: &str) -> RepoError {
    RepoError::new(RepoErrorKind::NoSuchTag)
        .with_op(op)
        .with_message(format!("no tag named '{}'", name))
}

fn no_such_pair(op: &str, name: &str, value: &str) -> RepoError {
    RepoError::new(RepoErrorKind::NoSuchTagValuePair)
        .with_op(op)
        .with_message(format!("'{}' is not a value of tag '{}'", value, name))
}

fn name_filter<T: cairn_core::tuple::Tuple>(name: &str) -> Result<Expr<T>> {
    let factory = ExpressionFactory::<T>::new()?;
    factory.attr_eq("name", factory.string(name))
}

fn pair_filter<T: cairn_core::tuple::Tuple>(name: &str, value: &str) -> Result<Expr<T>> {
    let factory = ExpressionFactory::<T>::new()?;
    factory.and(vec![
        factory.attr_eq("name", factory.string(name))?,
        factory.attr_eq("value", factory.string(value))?,
    ])
}

impl<B: Backend> RepositoryManager<B> {
    // ========== Vocabulary ==========

    /// Define a tag; returns false when it already exists (unchanged)
    ///
    /// # Errors
    ///
    /// Validation for a blank name, Persistence.
    pub fn create_tag(&self, tag: Tag) -> Result<bool> {
        instrumented("create_tag", || {
            if tag.name.trim().is_empty() {
                return Err(Self::blank_argument("create_tag", "tag name"));
            }
            let mut tag = tag;
            self.live::<Tag>()?.insert_if_new(&mut tag)
        })
    }

    /// Remove an unused tag together with its values
    ///
    /// # Errors
    ///
    /// NoSuchTag, ConstraintViolation while any object carries the tag.
    pub fn delete_tag(&self, name: &str) -> Result<()> {
        instrumented("delete_tag", || {
            let op = "delete_tag";
            let guard = TransactionGuard::begin(&self.backend)?;
            let tag = self.find_tag(name)?.ok_or_else(|| no_such_tag(op, name))?;

            let in_use = self
                .live::<ObjectTag>()?
                .count(Some(&name_filter::<ObjectTag>(name)?))?;
            if in_use > 0 {
                return Err(RepoError::new(RepoErrorKind::ConstraintViolation)
                    .with_op(op)
                    .with_message(format!("tag '{}' is assigned {} time(s)", name, in_use)));
            }

            let values = self.live::<TagValue>()?;
            for value in values.select(Some(&name_filter::<TagValue>(name)?), &[])? {
                values.delete(&value)?;
            }
            drop(values);
            self.live::<Tag>()?.delete(&tag)?;
            guard.commit()
        })
    }

    /// Add a permitted value; returns false when it already exists
    ///
    /// # Errors
    ///
    /// Validation for a blank value, NoSuchTag, Persistence.
    pub fn create_tag_value(&self, name: &str, value: &str) -> Result<bool> {
        instrumented("create_tag_value", || {
            if value.trim().is_empty() {
                return Err(Self::blank_argument("create_tag_value", "tag value"));
            }
            let guard = TransactionGuard::begin(&self.backend)?;
            if self.find_tag(name)?.is_none() {
                return Err(no_such_tag("create_tag_value", name));
            }
            let created = self
                .live::<TagValue>()?
                .insert_if_new(&mut TagValue::new(name, value))?;
            guard.commit()?;
            Ok(created)
        })
    }

    /// # Errors
    ///
    /// NoSuchTagValuePair, ConstraintViolation while any object carries
    /// the value.
    pub fn delete_tag_value(&self, name: &str, value: &str) -> Result<()> {
        instrumented("delete_tag_value", || {
            let op = "delete_tag_value";
            let guard = TransactionGuard::begin(&self.backend)?;
            let pair = self
                .find_tag_value(name, value)?
                .ok_or_else(|| no_such_pair(op, name, value))?;

            let in_use = self
                .live::<ObjectTag>()?
                .count(Some(&pair_filter::<ObjectTag>(name, value)?))?;
            if in_use > 0 {
                return Err(RepoError::new(RepoErrorKind::ConstraintViolation)
                    .with_op(op)
                    .with_message(format!(
                        "{}={} is assigned {} time(s)",
                        name, value, in_use
                    )));
            }
            self.live::<TagValue>()?.delete(&pair)?;
            guard.commit()
        })
    }

    /// All tags by name
    ///
    /// # Errors
    ///
    /// Persistence.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.live::<Tag>()?.select(None, &[SortKey::asc("name")])
    }

    /// Values of one tag, sorted
    ///
    /// # Errors
    ///
    /// NoSuchTag, Persistence.
    pub fn list_tag_values(&self, name: &str) -> Result<Vec<TagValue>> {
        if self.find_tag(name)?.is_none() {
            return Err(no_such_tag("list_tag_values", name));
        }
        self.live::<TagValue>()?
            .select(Some(&name_filter::<TagValue>(name)?), &[SortKey::asc("value")])
    }

    fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        self.live::<Tag>()?
            .first(Some(&name_filter::<Tag>(name)?), &[])
    }

    fn find_tag_value(&self, name: &str, value: &str) -> Result<Option<TagValue>> {
        self.live::<TagValue>()?
            .first(Some(&pair_filter::<TagValue>(name, value)?), &[])
    }

    // ========== Assignments ==========

    fn require_assignable(&self, op: &str, handle: i64, name: &str, value: &str) -> Result<()> {
        self.require_object(op, handle)?;
        if self.find_tag_value(name, value)?.is_none() {
            return Err(no_such_pair(op, name, value).with_handle(handle));
        }
        Ok(())
    }

    /// Assign `name=value` to an object; returns false if already assigned
    ///
    /// # Errors
    ///
    /// NoSuchHandle, NoSuchTagValuePair, Persistence.
    pub fn tag_object(&self, handle: i64, name: &str, value: &str) -> Result<bool> {
        instrumented("tag_object", || {
            let guard = TransactionGuard::begin(&self.backend)?;
            self.require_assignable("tag_object", handle, name, value)?;
            let added = self
                .live::<ObjectTag>()?
                .insert_if_new(&mut ObjectTag::new(handle, name, value))?;
            guard.commit()?;
            if added {
                self.invalidate_membership_cache();
            }
            Ok(added)
        })
    }

    /// Remove an assignment; returns false if it was not there
    ///
    /// # Errors
    ///
    /// NoSuchHandle, NoSuchTagValuePair, Persistence.
    pub fn untag_object(&self, handle: i64, name: &str, value: &str) -> Result<bool> {
        instrumented("untag_object", || {
            let guard = TransactionGuard::begin(&self.backend)?;
            self.require_assignable("untag_object", handle, name, value)?;
            let factory = ExpressionFactory::<ObjectTag>::new()?;
            let filter = factory.and(vec![
                pair_filter::<ObjectTag>(name, value)?,
                factory.attr_eq("handle", factory.long(handle))?,
            ])?;
            let assignments = self.live::<ObjectTag>()?;
            let removed = match assignments.first(Some(&filter), &[])? {
                Some(row) => {
                    assignments.delete(&row)?;
                    true
                }
                None => false,
            };
            drop(assignments);
            guard.commit()?;
            if removed {
                self.invalidate_membership_cache();
            }
            Ok(removed)
        })
    }

    /// Tags assigned to one object, by name then value
    ///
    /// # Errors
    ///
    /// NoSuchHandle, Persistence.
    pub fn get_object_tags(&self, handle: i64) -> Result<Vec<ObjectTag>> {
        self.require_object("get_object_tags", handle)?;
        self.live::<ObjectTag>()?.select(
            Some(&Self::handle_filter::<ObjectTag>(handle)?),
            &[SortKey::asc("name"), SortKey::asc("value")],
        )
    }

    // ========== Scrub ==========

    /// Canonicalize Sequence values, then drop values nobody uses
    ///
    /// With `report_only` the report lists what would change and nothing
    /// is written. Otherwise exactly the reported changes are applied in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Persistence.
    pub fn scrub_tags(&self, report_only: bool) -> Result<ScrubReport> {
        instrumented("scrub_tags", || {
            let guard = TransactionGuard::begin(&self.backend)?;
            let sequence_tags: HashSet<String> = self
                .live::<Tag>()?
                .select_all()?
                .into_iter()
                .filter(|tag| tag.tag_type == TagType::Sequence)
                .map(|tag| tag.name)
                .collect();
            let values = self
                .live::<TagValue>()?
                .select(None, &[SortKey::asc("name"), SortKey::asc("value")])?;
            let assignments = self.live::<ObjectTag>()?.select_all()?;

            let mut canonical: BTreeMap<(String, String), String> = BTreeMap::new();
            for pair in values.iter().filter(|v| sequence_tags.contains(&v.name)) {
                let spelled = canonical_sequence(&pair.value);
                if spelled != pair.value {
                    canonical.insert((pair.name.clone(), pair.value.clone()), spelled);
                }
            }
            let project = |name: &str, value: &str| -> (String, String) {
                let key = (name.to_string(), value.to_string());
                match canonical.get(&key) {
                    Some(spelled) => (key.0, spelled.clone()),
                    None => key,
                }
            };
            let used: HashSet<(String, String)> = assignments
                .iter()
                .map(|a| project(&a.name, &a.value))
                .collect();

            // Unused rows are reported and deleted as stored, never renamed
            let (kept, unused): (Vec<&TagValue>, Vec<&TagValue>) = values
                .iter()
                .partition(|v| used.contains(&project(&v.name, &v.value)));
            let renames: BTreeMap<(String, String), String> = kept
                .iter()
                .filter_map(|v| {
                    let key = (v.name.clone(), v.value.clone());
                    canonical.get(&key).map(|to| (key, to.clone()))
                })
                .collect();

            let mut report = ScrubReport {
                report_only,
                ..Default::default()
            };
            for ((name, from), to) in &renames {
                report.normalized.push(Normalization {
                    name: name.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    assignments: assignments
                        .iter()
                        .filter(|a| &a.name == name && &a.value == from)
                        .count(),
                });
            }
            report.unused = unused.into_iter().cloned().collect();

            if report_only {
                guard.commit()?;
                return Ok(report);
            }

            let tag_values = self.live::<TagValue>()?;
            let object_tags = self.live::<ObjectTag>()?;
            for ((name, from), to) in &renames {
                tag_values.insert_if_new(&mut TagValue::new(name.as_str(), to.as_str()))?;
                for assignment in assignments
                    .iter()
                    .filter(|a| &a.name == name && &a.value == from)
                {
                    object_tags.delete(assignment)?;
                    object_tags.insert_if_new(&mut ObjectTag::new(
                        assignment.handle,
                        name.as_str(),
                        to.as_str(),
                    ))?;
                }
                tag_values.delete(&TagValue::new(name.as_str(), from.as_str()))?;
            }
            for pair in &report.unused {
                tag_values.delete(pair)?;
            }
            drop(tag_values);
            drop(object_tags);
            guard.commit()?;
            self.invalidate_membership_cache();

            tracing::info!(
                normalized = report.normalized.len(),
                removed = report.unused.len(),
                "tag vocabulary scrubbed"
            );
            Ok(report)
        })
    }

    // ========== Membership ==========

    /// Drop the membership snapshot; the next query rebuilds it
    pub fn invalidate_membership_cache(&self) {
        *self.membership.borrow_mut() = None;
    }

    fn with_membership<R>(&self, read: impl FnOnce(&MembershipCache) -> R) -> Result<R> {
        let mut slot = self.membership.borrow_mut();
        let stale = slot
            .as_ref()
            .map_or(true, |cache| !cache.is_fresh(self.membership_ttl));
        if stale {
            let rows = self.live::<ObjectTag>()?.select_all()?;
            tracing::debug!(assignments = rows.len(), "membership cache rebuilt");
            *slot = Some(MembershipCache::build(rows));
        }
        match slot.as_ref() {
            Some(cache) => Ok(read(cache)),
            None => Err(RepoError::new(RepoErrorKind::Unexpected)
                .with_op("membership")
                .with_message("membership cache missing after rebuild")),
        }
    }

    /// Every handle carrying at least one tag, ascending
    ///
    /// # Errors
    ///
    /// Persistence while rebuilding the snapshot.
    pub fn tagged_handles(&self) -> Result<Vec<i64>> {
        self.with_membership(|cache| {
            let mut handles: Vec<i64> = cache.tagged_handles().iter().copied().collect();
            handles.sort_unstable();
            handles
        })
    }

    /// # Errors
    ///
    /// Persistence while rebuilding the snapshot.
    pub fn has_tag(&self, handle: i64, name: &str, value: &str, ignore_case: bool) -> Result<bool> {
        self.with_membership(|cache| cache.contains(handle, name, value, ignore_case))
    }

    /// # Errors
    ///
    /// Persistence while rebuilding the snapshot.
    pub fn handles_with_tag(&self, name: &str, value: &str, ignore_case: bool) -> Result<Vec<i64>> {
        self.with_membership(|cache| cache.handles_with(name, value, ignore_case))
    }

    /// # Errors
    ///
    /// Persistence while rebuilding the snapshot.
    pub fn tags_of_handle(&self, handle: i64) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.with_membership(|cache| cache.tags_of(handle))
    }
}
