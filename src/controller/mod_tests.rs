use super::*;
use crate::adapter::mock::{MockAdapter, RecordedCall};
use serde_json::{Value, json};

fn args(value: Value) -> AdapterArgs {
    AdapterArgs::try_from(value).unwrap()
}

fn seed() -> AdapterArgs {
    args(json!({"flagA": 1}))
}

mod transitions {
    use super::*;

    #[test]
    fn legal_pairs_advance_the_machine() {
        assert_eq!(
            AdapterState::Unconfigured.next(StateEvent::CallIssued),
            Some(AdapterState::Configuring)
        );
        assert_eq!(
            AdapterState::Configured.next(StateEvent::CallIssued),
            Some(AdapterState::Configuring)
        );
        assert_eq!(
            AdapterState::Configuring.next(StateEvent::CallCompleted),
            Some(AdapterState::Configured)
        );
    }

    #[test]
    fn illegal_pairs_yield_no_transition() {
        assert_eq!(AdapterState::Configuring.next(StateEvent::CallIssued), None);
        assert_eq!(
            AdapterState::Unconfigured.next(StateEvent::CallCompleted),
            None
        );
        assert_eq!(
            AdapterState::Configured.next(StateEvent::CallCompleted),
            None
        );
    }

    #[test]
    fn begin_while_configuring_is_a_silent_noop() {
        let mut controller = ConfigController::new(seed());

        assert!(controller.begin().is_some());
        assert_eq!(controller.state(), AdapterState::Configuring);

        // Re-entrancy guard: an outstanding call blocks further issues.
        assert!(controller.begin().is_none());
        assert_eq!(controller.state(), AdapterState::Configuring);
    }

    #[test]
    fn complete_with_no_outstanding_call_is_a_noop() {
        let mut controller = ConfigController::new(seed());
        controller.complete();
        assert_eq!(controller.state(), AdapterState::Unconfigured);

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());
        controller.complete();
        // The queued set must not be drained by a spurious completion.
        assert!(controller.pending_args().is_some());
        assert_eq!(controller.applied_args(), &seed());
    }
}

mod request_reconfiguration {
    use super::*;

    #[tokio::test]
    async fn commits_synchronously_while_configured() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());
        controller.startup(&adapter).await.unwrap();
        assert_eq!(controller.state(), AdapterState::Configured);

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        // Applied updates before any reconfigure call fires.
        assert_eq!(controller.applied_args(), &args(json!({"flagA": 1, "flagB": 2})));
        assert!(controller.pending_args().is_none());
        assert_eq!(adapter.calls().len(), 1);
    }

    #[test]
    fn queues_while_unconfigured_seeded_from_applied() {
        let mut controller = ConfigController::new(seed());

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        assert_eq!(controller.applied_args(), &seed());
        assert_eq!(
            controller.pending_args(),
            Some(&args(json!({"flagA": 1, "flagB": 2})))
        );
    }

    #[test]
    fn queues_while_configuring_without_calling_adapter() {
        let mut controller = ConfigController::new(seed());
        let call = controller.begin().unwrap();
        assert_eq!(call.kind(), AdapterCallKind::Configure);

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        // The request is observable only in the pending set; no new call
        // can be issued until the outstanding one resolves.
        assert!(controller.begin().is_none());
        assert_eq!(
            controller.pending_args(),
            Some(&args(json!({"flagA": 1, "flagB": 2})))
        );
    }

    #[test]
    fn back_to_back_requests_while_configuring_both_survive() {
        let mut controller = ConfigController::new(seed());
        controller.begin().unwrap();

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());
        controller.request_reconfiguration(args(json!({"flagC": 3})), ReconfigureOptions::merge());

        controller.complete();

        let applied = controller.applied_args();
        assert_eq!(applied.get("flagA"), Some(&json!(1)));
        assert_eq!(applied.get("flagB"), Some(&json!(2)));
        assert_eq!(applied.get("flagC"), Some(&json!(3)));
    }

    #[test]
    fn overwrite_request_discards_queued_state() {
        let mut controller = ConfigController::new(seed());
        controller.begin().unwrap();
        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        controller
            .request_reconfiguration(args(json!({"flagD": 4})), ReconfigureOptions::overwrite());

        assert_eq!(controller.pending_args(), Some(&args(json!({"flagD": 4}))));
    }

    #[test]
    fn successive_merges_last_write_wins_per_key() {
        let mut controller = ConfigController::new(seed());
        controller.begin().unwrap();

        controller.request_reconfiguration(args(json!({"flagA": 10})), ReconfigureOptions::merge());
        controller.request_reconfiguration(args(json!({"flagA": 20})), ReconfigureOptions::merge());

        assert_eq!(
            controller.pending_args(),
            Some(&args(json!({"flagA": 20})))
        );
    }
}

mod args_change {
    use super::*;

    #[tokio::test]
    async fn overwrites_once_configured() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());
        controller.startup(&adapter).await.unwrap();

        controller.handle_args_change(args(json!({"flagB": 2})));

        // Caller-driven changes take priority over the old applied set.
        assert_eq!(controller.applied_args(), &args(json!({"flagB": 2})));
    }

    #[test]
    fn merges_before_readiness() {
        let mut controller = ConfigController::new(seed());
        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        controller.handle_args_change(args(json!({"flagC": 3})));

        // Queued-before-ready state is preserved, not clobbered.
        assert_eq!(
            controller.pending_args(),
            Some(&args(json!({"flagA": 1, "flagB": 2, "flagC": 3})))
        );
    }
}

mod scheduler {
    use super::*;

    #[tokio::test]
    async fn startup_configures_with_seed_args() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());

        controller.startup(&adapter).await.unwrap();

        assert_eq!(adapter.calls(), vec![RecordedCall::Configure(seed())]);
        assert_eq!(controller.state(), AdapterState::Configured);
        assert_eq!(controller.applied_args(), &seed());
        assert!(controller.pending_args().is_none());
    }

    #[test]
    fn request_during_configure_drains_without_triggering_reconfigure() {
        let mut controller = ConfigController::new(seed());

        let call = controller.begin().unwrap();
        assert_eq!(call.kind(), AdapterCallKind::Configure);
        assert_eq!(call.args(), &seed());

        // A request arrives mid-flight.
        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());

        controller.complete();

        // Completion only drains pending into applied; the reconfigure
        // call itself waits for the next scheduler event.
        assert_eq!(
            controller.applied_args(),
            &args(json!({"flagA": 1, "flagB": 2}))
        );
        assert!(controller.pending_args().is_none());

        let next = controller.begin().unwrap();
        assert_eq!(next.kind(), AdapterCallKind::Reconfigure);
        assert_eq!(next.args(), &args(json!({"flagA": 1, "flagB": 2})));
    }

    #[tokio::test]
    async fn deferred_startup_makes_no_configure_call() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed()).with_deferred_configuration(true);

        controller.startup(&adapter).await.unwrap();

        assert!(adapter.calls().is_empty());
        assert_eq!(controller.state(), AdapterState::Unconfigured);
    }

    #[tokio::test]
    async fn deferred_drive_is_idle_until_externally_triggered() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed()).with_deferred_configuration(true);

        let made_call = controller.drive(&adapter).await.unwrap();

        assert!(!made_call);
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn default_flags_pushed_once_before_configure() {
        let mut flags = FlagSet::new();
        flags.insert("flagX", json!(true));

        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed()).with_default_flags(flags.clone());

        controller.startup(&adapter).await.unwrap();

        assert_eq!(
            adapter.calls(),
            vec![
                RecordedCall::FlagsPush(flags),
                RecordedCall::Configure(seed()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_default_flags_push_nothing() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());

        controller.startup(&adapter).await.unwrap();

        assert!(adapter.flag_pushes().is_empty());
    }

    #[tokio::test]
    async fn tick_while_configured_issues_reconfigure() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());
        controller.startup(&adapter).await.unwrap();

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());
        let made_call = controller.drive(&adapter).await.unwrap();

        assert!(made_call);
        assert_eq!(
            adapter.calls()[1],
            RecordedCall::Reconfigure(args(json!({"flagA": 1, "flagB": 2})))
        );
        assert_eq!(controller.state(), AdapterState::Configured);
    }

    #[test]
    fn pending_requests_during_reconfigure_drain_on_completion() {
        // Explicit design decision: pending args drain after BOTH the
        // configure and the reconfigure completion paths, so a request
        // that raced either call is committed exactly once.
        let mut controller = ConfigController::new(seed());
        controller.begin().unwrap();
        controller.complete();
        assert_eq!(controller.state(), AdapterState::Configured);

        let call = controller.begin().unwrap();
        assert_eq!(call.kind(), AdapterCallKind::Reconfigure);

        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());
        controller.complete();

        assert_eq!(
            controller.applied_args(),
            &args(json!({"flagA": 1, "flagB": 2}))
        );
        assert!(controller.pending_args().is_none());
    }

    #[tokio::test]
    async fn failed_configure_leaves_controller_configuring() {
        let adapter = MockAdapter::with_results(vec![Err(AdapterError::Unavailable {
            message: "connection refused".to_string(),
        })]);
        let mut controller = ConfigController::new(seed());

        let err = controller.startup(&adapter).await.unwrap_err();
        assert!(matches!(err, ControllerError::Configure(_)));
        assert_eq!(controller.state(), AdapterState::Configuring);

        // Stuck by design: no further calls are issued, requests queue forever.
        assert!(!controller.drive(&adapter).await.unwrap());
        controller.request_reconfiguration(args(json!({"flagB": 2})), ReconfigureOptions::merge());
        assert!(controller.pending_args().is_some());
        assert_eq!(adapter.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_reconfigure_maps_to_reconfigure_error() {
        let adapter = MockAdapter::with_results(vec![
            Ok(()),
            Err(AdapterError::Rejected {
                reason: "bad key".to_string(),
            }),
        ]);
        let mut controller = ConfigController::new(seed());
        controller.startup(&adapter).await.unwrap();

        let err = controller.drive(&adapter).await.unwrap_err();

        assert!(matches!(err, ControllerError::Reconfigure(_)));
        assert_eq!(controller.state(), AdapterState::Configuring);
    }

    #[tokio::test]
    async fn readiness_comes_from_the_adapter_not_the_controller() {
        let adapter = MockAdapter::new();
        let mut controller = ConfigController::new(seed());

        assert!(!adapter.is_ready());
        controller.startup(&adapter).await.unwrap();
        assert!(adapter.is_ready());
    }
}
