//! Tests for the voice command session

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use crate::{
        confirmation::{ConfirmOutcome, ConfirmationState},
        parser::{CommandAction, CommandParser},
        test_support::CountingStore,
        voice::{SpeechInput, VoiceCommandSession, VoiceConfig, VoiceError, VoicePoll},
    };

    #[derive(Default)]
    struct FakeSpeech {
        supported: bool,
        listening: bool,
        transcript: String,
        resets: usize,
    }

    impl SpeechInput for FakeSpeech {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn is_listening(&self) -> bool {
            self.listening
        }

        fn transcript(&self) -> String {
            self.transcript.clone()
        }

        fn start_listening(&mut self) {
            self.listening = true;
        }

        fn stop_listening(&mut self) {
            self.listening = false;
        }

        fn reset_transcript(&mut self) {
            self.transcript.clear();
            self.resets += 1;
        }
    }

    async fn session(titles: &[&str]) -> (Arc<CountingStore>, VoiceCommandSession<FakeSpeech>) {
        let store = Arc::new(CountingStore::with_tasks(titles).await);
        let speech = FakeSpeech {
            supported: true,
            ..Default::default()
        };
        let session = VoiceCommandSession::new(
            speech,
            store.clone(),
            CommandParser::default(),
            &VoiceConfig::default(),
        );
        (store, session)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn test_parses_once_after_settle_delay() {
        let (_store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "delete the milk task".to_string();
        assert_eq!(session.poll(t0).await.unwrap(), VoicePoll::Waiting);

        session.stop_listening(t0);
        assert!(session.is_settling());
        assert_eq!(session.poll(t0 + ms(599)).await.unwrap(), VoicePoll::Waiting);

        let VoicePoll::Staged(preview) = session.poll(t0 + ms(600)).await.unwrap() else {
            panic!("expected a staged command");
        };
        assert_eq!(preview.action, CommandAction::Delete);
        assert_eq!(session.controller().state(), ConfirmationState::Pending);

        // no second parse
        assert_eq!(session.poll(t0 + ms(5000)).await.unwrap(), VoicePoll::Waiting);
    }

    #[tokio::test]
    async fn test_late_transcript_update_is_used() {
        let (_store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "delete the".to_string();
        session.stop_listening(t0);

        session.speech_mut().transcript = "delete the milk task".to_string();
        session.observe(t0 + ms(200));

        let poll = session.poll(t0 + ms(600)).await.unwrap();
        assert!(matches!(poll, VoicePoll::Staged(_)));
    }

    #[tokio::test]
    async fn test_restart_clears_pending_command() {
        let (store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "delete the milk task".to_string();
        session.stop_listening(t0);
        session.poll(t0 + ms(600)).await.unwrap();
        assert_eq!(session.controller().state(), ConfirmationState::Pending);

        session.start_listening().unwrap();
        assert_eq!(session.controller().state(), ConfirmationState::Idle);
        assert_eq!(session.speech().transcript, "");
        assert_eq!(session.speech().resets, 2);
        assert_eq!(session.controller_mut().cancel(), ConfirmOutcome::NothingPending);
        assert_eq!(store.deletes(), 0);
    }

    #[tokio::test]
    async fn test_restart_during_settle_drops_transcript() {
        let (_store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "delete the milk task".to_string();
        session.stop_listening(t0);

        session.start_listening().unwrap();
        assert!(!session.is_settling());
        assert_eq!(session.poll(t0 + ms(1000)).await.unwrap(), VoicePoll::Waiting);
    }

    #[tokio::test]
    async fn test_unrecognised_speech() {
        let (_store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "what a lovely day".to_string();
        session.stop_listening(t0);

        assert_eq!(
            session.poll(t0 + ms(600)).await.unwrap(),
            VoicePoll::NoCommand {
                transcript: "what a lovely day".to_string()
            }
        );
        assert_eq!(session.controller().state(), ConfirmationState::Idle);
    }

    #[tokio::test]
    async fn test_confirm_through_session() {
        let (store, mut session) = session(&["Buy milk"]).await;
        let t0 = Instant::now();

        session.start_listening().unwrap();
        session.speech_mut().transcript = "i finished the milk task".to_string();
        session.stop_listening(t0);
        session.poll(t0 + ms(600)).await.unwrap();

        let outcome = session.controller_mut().confirm().await;
        assert!(matches!(outcome, ConfirmOutcome::Applied { .. }));
        assert_eq!(store.updates(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_engine() {
        let (_store, mut session) = session(&[]).await;
        session.speech_mut().supported = false;
        assert!(matches!(
            session.start_listening(),
            Err(VoiceError::Unsupported)
        ));
        assert!(!session.speech().listening);
    }
}
