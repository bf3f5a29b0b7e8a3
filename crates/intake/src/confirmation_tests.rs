//! Tests for the confirmation controller

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        confirmation::{
            ConfirmKey, ConfirmOutcome, ConfirmationController, ConfirmationError,
            ConfirmationState,
        },
        models::{Area, Priority, TaskStatus},
        parser::{parse_command, CommandAction},
        store::EntityStore,
        test_support::CountingStore,
    };

    async fn setup(titles: &[&str]) -> (Arc<CountingStore>, ConfirmationController) {
        let store = Arc::new(CountingStore::with_tasks(titles).await);
        let controller = ConfirmationController::new(store.clone());
        (store, controller)
    }

    #[tokio::test]
    async fn test_confirm_twice_applies_once() {
        let (store, mut controller) = setup(&["Buy milk"]).await;
        let tasks = store.list_tasks().await.unwrap();
        let cmd = parse_command("mark the milk task as done", &tasks).unwrap();

        controller.propose(cmd).await.unwrap();
        assert_eq!(controller.state(), ConfirmationState::Pending);
        assert_eq!(store.updates(), 0);

        let first = controller.confirm().await;
        let second = controller.confirm().await;

        assert_eq!(
            first,
            ConfirmOutcome::Applied {
                applied: vec!["task-1".to_string()],
                failed: vec![],
            }
        );
        assert_eq!(second, ConfirmOutcome::NothingPending);
        assert_eq!(store.updates(), 1);
        assert_eq!(controller.state(), ConfirmationState::Idle);
        assert_eq!(store.list_tasks().await.unwrap()[0].status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_cancel_discards_without_mutation() {
        let (store, mut controller) = setup(&["Buy milk"]).await;
        let tasks = store.list_tasks().await.unwrap();
        controller
            .propose(parse_command("delete the milk task", &tasks).unwrap())
            .await
            .unwrap();

        assert_eq!(controller.cancel(), ConfirmOutcome::Discarded);
        assert_eq!(controller.cancel(), ConfirmOutcome::NothingPending);
        assert_eq!(store.deletes(), 0);
        assert_eq!(store.list_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_proposal_rejected_while_pending() {
        let (store, mut controller) = setup(&["Buy milk", "Call mom"]).await;
        let tasks = store.list_tasks().await.unwrap();
        controller
            .propose(parse_command("delete the milk task", &tasks).unwrap())
            .await
            .unwrap();

        let err = controller
            .propose(parse_command("delete call mom", &tasks).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmationError::Busy));
        assert_eq!(
            controller.pending_command().unwrap().matched_task_ids,
            vec!["task-1"]
        );
    }

    #[tokio::test]
    async fn test_keys_map_to_transitions() {
        let (store, mut controller) = setup(&["Buy milk"]).await;
        let tasks = store.list_tasks().await.unwrap();

        for key in [ConfirmKey::Escape, ConfirmKey::Backdrop] {
            controller
                .propose(parse_command("delete the milk task", &tasks).unwrap())
                .await
                .unwrap();
            assert_eq!(controller.handle_key(key).await, ConfirmOutcome::Discarded);
        }
        assert_eq!(store.deletes(), 0);

        controller
            .propose(parse_command("delete the milk task", &tasks).unwrap())
            .await
            .unwrap();
        let outcome = controller.handle_key(ConfirmKey::Enter).await;
        assert!(matches!(outcome, ConfirmOutcome::Applied { .. }));
        assert_eq!(store.deletes(), 1);
        assert!(store.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_uses_defaults() {
        let (store, mut controller) = setup(&[]).await;
        let cmd = parse_command("remind me to call mom", &[]).unwrap();

        let preview = controller.propose(cmd).await.unwrap();
        let create = preview.create.clone().unwrap();
        assert_eq!(create.title, "call mom");
        assert_eq!(create.priority, Priority::Medium);

        controller.confirm().await;
        let tasks = store.list_tasks().await.unwrap();
        assert_eq!(store.creates(), 1);
        assert_eq!(tasks[0].title, "call mom");
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].status, TaskStatus::Todo);
        assert_eq!(tasks[0].area, None);
    }

    #[tokio::test]
    async fn test_preview_shows_current_and_proposed() {
        let (store, mut controller) = setup(&["Go to the gym"]).await;
        let tasks = store.list_tasks().await.unwrap();

        let preview = controller
            .propose(parse_command("make the gym task urgent", &tasks).unwrap())
            .await
            .unwrap();
        assert_eq!(preview.action, CommandAction::SetPriority);
        assert!(!preview.ambiguous);
        assert_eq!(preview.changes.len(), 1);
        assert_eq!(preview.changes[0].current, "medium");
        assert_eq!(preview.changes[0].proposed, "urgent");
        controller.cancel();

        let preview = controller
            .propose(parse_command("move the gym task to fitness", &tasks).unwrap())
            .await
            .unwrap();
        assert_eq!(preview.changes[0].current, "none");
        assert_eq!(preview.changes[0].proposed, "health");

        controller.confirm().await;
        assert_eq!(store.list_tasks().await.unwrap()[0].area, Some(Area::Health));
    }

    #[tokio::test]
    async fn test_ambiguous_preview_lists_every_candidate() {
        let (store, mut controller) = setup(&["Pay rent", "Pay taxes", "Pay phone bill"]).await;
        let tasks = store.list_tasks().await.unwrap();

        let preview = controller
            .propose(parse_command("complete pay bills", &tasks).unwrap())
            .await
            .unwrap();
        assert!(preview.ambiguous);
        assert_eq!(preview.changes.len(), 3);
        assert!(preview.changes.iter().all(|c| c.proposed == "done"));
    }

    #[tokio::test]
    async fn test_failures_are_collected_not_rolled_back() {
        let (store, mut controller) = setup(&["Pay rent", "Pay taxes", "Pay phone bill"]).await;
        let tasks = store.list_tasks().await.unwrap();
        store.fail_writes_to("task-1");

        controller
            .propose(parse_command("complete pay bills", &tasks).unwrap())
            .await
            .unwrap();
        let ConfirmOutcome::Applied { applied, failed } = controller.confirm().await else {
            panic!("expected applied outcome");
        };

        assert_eq!(applied, vec!["task-3", "task-2"]);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task_id.as_deref(), Some("task-1"));
        assert_eq!(store.updates(), 3);

        let tasks = store.list_tasks().await.unwrap();
        assert_eq!(tasks[0].status, TaskStatus::Todo);
        assert_eq!(tasks[1].status, TaskStatus::Done);
        assert_eq!(tasks[2].status, TaskStatus::Done);
    }
}
