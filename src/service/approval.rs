use crate::config::DEFAULT_TRANSITION_ATTEMPTS;
use crate::error::{Error, Result};
use crate::identity::{Principal, Role};
use crate::state::{
    can_act, transition, Application, ApprovalHook, Decision, Location, MemberType,
    NoOpHook, PaymentStatus, Status,
};
use crate::storage::ApplicationStore;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Payload the submission collaborator hands over once the forms are complete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub member_type: MemberType,
    pub state: String,
    pub district: String,
    pub block: String,
    pub city: String,
}

/// The only mutation surface for application status.
pub struct ApplicationService {
    store: Arc<dyn ApplicationStore>,
    hook: Arc<dyn ApprovalHook>,
    max_attempts: u32,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        ApplicationService {
            store,
            hook: Arc::new(NoOpHook),
            max_attempts: DEFAULT_TRANSITION_ATTEMPTS,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ApprovalHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Set the read-transition-write budget. At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Create a new application in `pending_block_approval`.
    pub fn submit(&self, principal: &Principal, request: SubmitRequest) -> Result<Application> {
        if principal.role() != Role::Member {
            return Err(Error::Forbidden(format!(
                "Only members submit applications; caller is {}",
                principal.role()
            )));
        }

        let location = Location {
            state: required(&request.state, "state")?,
            district: required(&request.district, "district")?,
            block: required(&request.block, "block")?,
            city: required(&request.city, "city")?,
        };

        let app = Application::submitted(
            Uuid::new_v4().to_string(),
            principal.id().to_string(),
            request.member_type,
            location,
            Utc::now(),
        );
        // The store refuses a second open application for the same owner.
        self.store.insert(app.clone())?;
        tracing::info!(
            application_id = %app.application_id,
            user_id = %app.user_id,
            "application submitted"
        );

        if let Err(e) = self.hook.on_submitted(&app) {
            tracing::warn!(application_id = %app.application_id, error = %e, "submit hook failed");
        }
        Ok(app)
    }

    pub fn approve(
        &self,
        principal: &Principal,
        application_id: &str,
        remarks: Option<String>,
    ) -> Result<Application> {
        self.decide(principal, application_id, Decision::Approve, remarks)
    }

    pub fn reject(
        &self,
        principal: &Principal,
        application_id: &str,
        remarks: Option<String>,
    ) -> Result<Application> {
        self.decide(principal, application_id, Decision::Reject, remarks)
    }

    /// Entry point for the payment collaborator once an application is approved.
    pub fn record_payment(&self, application_id: &str, status: PaymentStatus) -> Result<Application> {
        for attempt in 1..=self.max_attempts {
            let current = self
                .store
                .get(application_id)?
                .ok_or_else(|| Error::NotFound(application_id.to_string()))?;

            let mut next = current.clone();
            next.record_payment(status, Utc::now())?;

            if self.store.compare_and_swap(current.version, &next)? {
                tracing::info!(application_id, payment = ?status, "payment recorded");
                return Ok(next);
            }
            tracing::debug!(application_id, attempt, "stale payment write; retrying");
        }

        Err(Error::Conflict(format!(
            "Application {} kept changing; re-fetch and retry",
            application_id
        )))
    }

    /// Load, authorize, transition and conditionally write, retrying on a
    /// stale write while the observed status is unchanged.
    ///
    /// Exactly one write on success, none on any error.
    fn decide(
        &self,
        principal: &Principal,
        application_id: &str,
        decision: Decision,
        remarks: Option<String>,
    ) -> Result<Application> {
        let remarks = remarks
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let mut observed: Option<Status> = None;

        for attempt in 1..=self.max_attempts {
            let current = self
                .store
                .get(application_id)?
                .ok_or_else(|| Error::NotFound(application_id.to_string()))?;

            match observed {
                Some(status) if status != current.status => {
                    tracing::warn!(
                        application_id,
                        from = %status,
                        to = %current.status,
                        "concurrent transition won"
                    );
                    return Err(Error::Conflict(format!(
                        "Application {} moved from {} to {} while this {} was in flight",
                        application_id, status, current.status, decision
                    )));
                }
                Some(_) => {}
                None => observed = Some(current.status),
            }

            if !can_act(principal, &current) {
                return Err(Error::Forbidden(format!(
                    "{} {} has no jurisdiction over application {}",
                    principal.role(),
                    principal.id(),
                    application_id
                )));
            }

            let next = transition(&current, principal, decision, remarks.clone(), Utc::now())?;

            if self.store.compare_and_swap(current.version, &next)? {
                tracing::info!(
                    application_id,
                    actor = principal.id(),
                    %decision,
                    from = %current.status,
                    to = %next.status,
                    "transition committed"
                );
                self.after_commit(&next, decision);
                return Ok(next);
            }

            tracing::debug!(application_id, attempt, "stale write; retrying");
        }

        tracing::warn!(application_id, attempts = self.max_attempts, "retry budget exhausted");
        Err(Error::Conflict(format!(
            "Application {} kept changing; re-fetch and retry",
            application_id
        )))
    }

    fn after_commit(&self, app: &Application, decision: Decision) {
        if let Err(e) = self.hook.on_decided(app, decision) {
            tracing::warn!(application_id = %app.application_id, error = %e, "decision hook failed");
        }
        if app.status == Status::Approved {
            if let Err(e) = self.hook.on_approved(app) {
                tracing::warn!(application_id = %app.application_id, error = %e, "approval hook failed");
            }
        }
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("'{}' must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransitionError;
    use crate::state::{Level, SlotStatus, Visibility};
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn haveli_request() -> SubmitRequest {
        SubmitRequest {
            member_type: MemberType::Aspirant,
            state: "Maharashtra".to_string(),
            district: "Pune".to_string(),
            block: "Haveli".to_string(),
            city: "Loni Kalbhor".to_string(),
        }
    }

    fn setup() -> (ApplicationService, Arc<MemoryStorage>, Application) {
        let store = Arc::new(MemoryStorage::new());
        let service = ApplicationService::new(store.clone());
        let app = service
            .submit(&Principal::member("user-1", "Kiran"), haveli_request())
            .unwrap();
        (service, store, app)
    }

    #[derive(Default)]
    struct RecordingHook {
        approved: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ApprovalHook for RecordingHook {
        fn on_approved(&self, app: &Application) -> Result<()> {
            self.approved.lock().unwrap().push(app.application_id.clone());
            if self.fail {
                return Err(Error::Storage("mailer down".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_submit_initial_state() {
        let (_service, store, app) = setup();
        assert_eq!(app.status, Status::PendingBlockApproval);
        assert_eq!(app.user_id, "user-1");
        assert_eq!(store.get(&app.application_id).unwrap().unwrap(), app);
    }

    #[test]
    fn test_submit_rejects_admins() {
        let (service, _store, _app) = setup();
        let admin = Principal::super_admin("root", "Root");
        let err = service.submit(&admin, haveli_request()).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_submit_requires_location() {
        let service = ApplicationService::new(Arc::new(MemoryStorage::new()));
        let mut request = haveli_request();
        request.block = "  ".to_string();
        let err = service
            .submit(&Principal::member("user-2", "Dev"), request)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_submit_twice_while_open() {
        let (service, _store, _app) = setup();
        let err = service
            .submit(&Principal::member("user-1", "Kiran"), haveli_request())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
    }

    #[test]
    fn test_submit_again_after_rejection() {
        let (service, _store, app) = setup();
        let block = Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli");
        service.reject(&block, &app.application_id, None).unwrap();

        let second = service
            .submit(&Principal::member("user-1", "Kiran"), haveli_request())
            .unwrap();
        assert_ne!(second.application_id, app.application_id);
    }

    #[test]
    fn test_approve_not_found() {
        let (service, _store, _app) = setup();
        let block = Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli");
        let err = service.approve(&block, "missing", None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_blank_remarks_are_dropped() {
        let (service, _store, app) = setup();
        let block = Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli");
        let next = service
            .approve(&block, &app.application_id, Some("   ".to_string()))
            .unwrap();
        assert_eq!(next.approvals.slot(Level::Block).remarks, None);
    }

    #[test]
    fn test_member_cannot_approve_own_application() {
        let (service, _store, app) = setup();
        let err = service
            .approve(&Principal::member("user-1", "Kiran"), &app.application_id, None)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_hook_fires_on_final_approval_only() {
        let store = Arc::new(MemoryStorage::new());
        let hook = Arc::new(RecordingHook::default());
        let service = ApplicationService::new(store.clone()).with_hook(hook.clone());
        let app = service
            .submit(&Principal::member("user-1", "Kiran"), haveli_request())
            .unwrap();
        let id = app.application_id.as_str();

        service
            .approve(&Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli"), id, None)
            .unwrap();
        service
            .approve(&Principal::district_admin("d-1", "Ravi", "Maharashtra", "Pune"), id, None)
            .unwrap();
        assert!(hook.approved.lock().unwrap().is_empty());

        service
            .approve(&Principal::state_admin("s-1", "Meera", "Maharashtra"), id, None)
            .unwrap();
        assert_eq!(*hook.approved.lock().unwrap(), vec![id.to_string()]);
    }

    #[test]
    fn test_hook_failure_does_not_roll_back() {
        let store = Arc::new(MemoryStorage::new());
        let hook = Arc::new(RecordingHook {
            fail: true,
            ..RecordingHook::default()
        });
        let service = ApplicationService::new(store.clone()).with_hook(hook);
        let mut app = service
            .submit(&Principal::member("user-1", "Kiran"), haveli_request())
            .unwrap();
        app.status = Status::PendingStateApproval;
        app.version = 1;
        assert!(store.compare_and_swap(0, &app).unwrap());

        let approved = service
            .approve(&Principal::state_admin("s-1", "Meera", "Maharashtra"), &app.application_id, None)
            .unwrap();
        assert_eq!(approved.status, Status::Approved);
        assert_eq!(store.get(&app.application_id).unwrap().unwrap().status, Status::Approved);
    }

    /// Store that lets a competing writer in between a read and the conditional write.
    struct RacingStore {
        inner: MemoryStorage,
        interference: Interference,
        swaps: AtomicUsize,
        commits: AtomicUsize,
    }

    enum Interference {
        /// Another district admin commits an approval first.
        CompetingApproval,
        /// Something else bumps the version without touching status, every time.
        VersionBumpAlways,
        /// Version bump once, then the store behaves.
        VersionBumpOnce,
    }

    impl RacingStore {
        fn new(interference: Interference) -> Self {
            RacingStore {
                inner: MemoryStorage::new(),
                interference,
                swaps: AtomicUsize::new(0),
                commits: AtomicUsize::new(0),
            }
        }

        fn interfere(&self, id: &str) {
            let current = self.inner.get(id).unwrap().unwrap();
            let mut next = match self.interference {
                Interference::CompetingApproval => {
                    let rival = Principal::district_admin("d-2", "Rival", "Maharashtra", "Pune");
                    transition(&current, &rival, Decision::Approve, None, Utc::now()).unwrap()
                }
                Interference::VersionBumpAlways | Interference::VersionBumpOnce => {
                    let mut touched = current.clone();
                    touched.city = format!("{}*", current.city);
                    touched.version += 1;
                    touched
                }
            };
            next.last_updated = Utc::now();
            assert!(self.inner.compare_and_swap(current.version, &next).unwrap());
        }
    }

    impl ApplicationStore for RacingStore {
        fn insert(&self, app: Application) -> Result<()> {
            self.inner.insert(app)
        }

        fn get(&self, application_id: &str) -> Result<Option<Application>> {
            self.inner.get(application_id)
        }

        fn compare_and_swap(&self, expected_version: u64, next: &Application) -> Result<bool> {
            let n = self.swaps.fetch_add(1, Ordering::SeqCst);
            let interfere = match self.interference {
                Interference::VersionBumpAlways => true,
                Interference::CompetingApproval | Interference::VersionBumpOnce => n == 0,
            };
            if interfere {
                self.interfere(&next.application_id);
            }
            let ok = self.inner.compare_and_swap(expected_version, next)?;
            if ok {
                self.commits.fetch_add(1, Ordering::SeqCst);
            }
            Ok(ok)
        }

        fn scan(&self, visibility: &Visibility) -> Result<Vec<Application>> {
            self.inner.scan(visibility)
        }
    }

    fn racing_setup(interference: Interference) -> (ApplicationService, Arc<RacingStore>, String) {
        let store = Arc::new(RacingStore::new(interference));
        let mut app = Application::submitted(
            "app-race".to_string(),
            "user-1".to_string(),
            MemberType::Business,
            Location {
                state: "Maharashtra".to_string(),
                district: "Pune".to_string(),
                block: "Haveli".to_string(),
                city: "Pune".to_string(),
            },
            Utc::now(),
        );
        app.status = Status::PendingDistrictApproval;
        app.approvals.block.status = SlotStatus::Approved;
        store.insert(app).unwrap();
        let service = ApplicationService::new(store.clone());
        (service, store, "app-race".to_string())
    }

    #[test]
    fn test_competing_approval_yields_conflict() {
        let (service, store, id) = racing_setup(Interference::CompetingApproval);
        let district = Principal::district_admin("d-1", "Ravi", "Maharashtra", "Pune");

        let err = service.approve(&district, &id, None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let stored = store.get(&id).unwrap().unwrap();
        assert_eq!(stored.status, Status::PendingStateApproval);
        assert_eq!(stored.approvals.district.admin_id.as_deref(), Some("d-2"));
        // only the rival's entry was appended
        assert_eq!(stored.approval_history.len(), 2);
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unrelated_write_is_retried() {
        let (service, store, id) = racing_setup(Interference::VersionBumpOnce);
        let district = Principal::district_admin("d-1", "Ravi", "Maharashtra", "Pune");

        let next = service.approve(&district, &id, None).unwrap();
        assert_eq!(next.status, Status::PendingStateApproval);
        assert_eq!(next.city, "Pune*");
        assert_eq!(store.swaps.load(Ordering::SeqCst), 2);
        assert_eq!(store.commits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let (service, store, id) = racing_setup(Interference::VersionBumpAlways);
        let district = Principal::district_admin("d-1", "Ravi", "Maharashtra", "Pune");

        let err = service.approve(&district, &id, None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.swaps.load(Ordering::SeqCst), 2);
        assert_eq!(store.commits.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get(&id).unwrap().unwrap().status,
            Status::PendingDistrictApproval
        );
    }

    #[test]
    fn test_stage_error_propagates_verbatim() {
        let (service, _store, id) = racing_setup(Interference::VersionBumpOnce);
        let block = Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli");
        let err = service.approve(&block, &id, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Transition(TransitionError::InvalidStage {
                status: Status::PendingDistrictApproval,
                role: Role::BlockAdmin,
            })
        ));
    }

    #[test]
    fn test_payment_only_after_final_approval() {
        let (service, _store, app) = setup();
        let id = app.application_id.clone();

        let err = service
            .record_payment(&id, PaymentStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PaymentNotAllowed(Status::PendingBlockApproval)
        ));

        let block = Principal::block_admin("b-1", "Asha", "Maharashtra", "Pune", "Haveli");
        let district = Principal::district_admin("d-1", "Ravi", "Maharashtra", "Pune");
        let state = Principal::state_admin("s-1", "Meera", "Maharashtra");
        service.approve(&block, &id, None).unwrap();
        service.approve(&district, &id, None).unwrap();
        let approved = service.approve(&state, &id, None).unwrap();

        let paid = service
            .record_payment(&id, PaymentStatus::Completed)
            .unwrap();
        assert_eq!(paid.payment_status, Some(PaymentStatus::Completed));
        assert!(paid.payment_date.is_some());
        assert_eq!(paid.version, approved.version + 1);
        assert_eq!(paid.status, Status::Approved);
    }
}
