use crate::error::{Error, Result};
use crate::identity::Principal;
use crate::state::{classify, visibility, Application, MemberType, Standing, Status, Viewpoint};
use crate::storage::ApplicationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller-side narrowing applied after the jurisdiction predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub status: Option<Status>,
    pub member_type: Option<MemberType>,
    pub district: Option<String>,
    pub block: Option<String>,
    /// Standing from the caller's own level, e.g. `awaiting` for a work queue.
    pub standing: Option<Standing>,
    /// Case-insensitive substring over id, city, district and block.
    pub search: Option<String>,
}

impl ListFilter {
    fn matches(&self, app: &Application, viewpoint: Viewpoint) -> bool {
        if self.status.is_some_and(|s| s != app.status) {
            return false;
        }
        if self.member_type.is_some_and(|m| m != app.member_type) {
            return false;
        }
        if let Some(district) = non_empty(&self.district) {
            if !app.district.eq_ignore_ascii_case(district) {
                return false;
            }
        }
        if let Some(block) = non_empty(&self.block) {
            if !app.block.eq_ignore_ascii_case(block) {
                return false;
            }
        }
        if let Some(standing) = self.standing {
            if classify(app, viewpoint) != standing {
                return false;
            }
        }
        if let Some(term) = non_empty(&self.search) {
            let term = term.to_lowercase();
            let hit = [
                app.application_id.as_str(),
                app.city.as_str(),
                app.district.as_str(),
                app.block.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberTypeCounts {
    pub aspirant: usize,
    pub business: usize,
}

/// Dashboard counts, computed from the caller's own level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub by_member_type: MemberTypeCounts,
}

/// Read side: every query starts from the caller's visibility predicate.
pub struct ListingService {
    store: Arc<dyn ApplicationStore>,
}

impl ListingService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        ListingService { store }
    }

    /// Applications visible to `principal`, newest update first.
    pub fn list(&self, principal: &Principal, filter: &ListFilter) -> Result<Vec<Application>> {
        let viewpoint = Viewpoint::for_principal(principal);
        let mut apps: Vec<Application> = self
            .store
            .scan(&visibility(principal))?
            .into_iter()
            .filter(|app| filter.matches(app, viewpoint))
            .collect();
        apps.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        Ok(apps)
    }

    pub fn get(&self, principal: &Principal, application_id: &str) -> Result<Application> {
        let app = self
            .store
            .get(application_id)?
            .ok_or_else(|| Error::NotFound(application_id.to_string()))?;
        if !visibility(principal).matches(&app) {
            return Err(Error::Forbidden(format!(
                "Application {} is outside the caller's jurisdiction",
                application_id
            )));
        }
        Ok(app)
    }

    pub fn stats(&self, principal: &Principal) -> Result<Stats> {
        let viewpoint = Viewpoint::for_principal(principal);
        let mut stats = Stats::default();
        for app in self.store.scan(&visibility(principal))? {
            stats.total += 1;
            match app.member_type {
                MemberType::Aspirant => stats.by_member_type.aspirant += 1,
                MemberType::Business => stats.by_member_type.business += 1,
            }
            match classify(&app, viewpoint) {
                Standing::Awaiting => stats.pending += 1,
                Standing::Passed => stats.approved += 1,
                Standing::Rejected => stats.rejected += 1,
                Standing::Upstream => {}
            }
        }
        Ok(stats)
    }
}
