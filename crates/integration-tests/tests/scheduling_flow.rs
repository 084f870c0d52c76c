//! Scheduling flow end to end
//!
//! Slot suggestions, booking, and the notices the notification queue
//! delivers for schedule, reschedule and cancel.

mod common;

use async_trait::async_trait;
use common::{at, Harness};
use hireloop_core::application::directory::AddBusyBlockRequest;
use hireloop_core::application::{ScheduleInterviewRequest, SuggestSlotsRequest};
use hireloop_core::domain::{
    InterviewState, JobState, TimeRange, HOUR_MS, MINUTE_MS, NOTIFICATIONS_QUEUE,
};
use hireloop_core::port::notifier::mocks::RecordingNotifier;
use hireloop_core::port::{
    InterviewRepository, Notification, NotificationKind, Notifier, NotifyError,
};
use hireloop_core::AppError;
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Mailer {}

    #[async_trait]
    impl Notifier for Mailer {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
    }
}

fn booking(tenant_id: &str, candidate: &str, interviewers: &[&str], start: i64, end: i64) -> ScheduleInterviewRequest {
    ScheduleInterviewRequest {
        tenant_id: tenant_id.to_string(),
        candidate_id: candidate.to_string(),
        interviewer_ids: interviewers.iter().map(|s| s.to_string()).collect(),
        start,
        end,
        title: None,
    }
}

#[tokio::test]
async fn test_suggested_slots_avoid_busy_time() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let morning = TimeRange::from_bounds(at(1, 9), at(1, 12));
    h.directory
        .add_busy_block(AddBusyBlockRequest {
            tenant_id: seed.tenant_id.clone(),
            user_id: seed.alice.clone(),
            start: morning.start,
            end: morning.end,
            title: Some("Planning".to_string()),
        })
        .await
        .unwrap();

    let slots = h
        .slots
        .suggest(SuggestSlotsRequest {
            tenant_id: seed.tenant_id.clone(),
            required_participants: vec![seed.alice.clone(), seed.bob.clone()],
            optional_participants: vec![],
            duration_minutes: 60,
            window_start: Some(at(1, 0)),
            window_end: Some(at(2, 0)),
            limit: None,
        })
        .await
        .unwrap();

    assert!(!slots.is_empty(), "Tuesday afternoon is free for both");
    assert!(slots.len() <= 3, "one day yields at most max_slots_per_day");

    let workday = TimeRange::from_bounds(at(1, 9), at(1, 17));
    for slot in &slots {
        assert_eq!(slot.range.duration_ms(), HOUR_MS);
        assert!(workday.contains(&slot.range), "{} outside working hours", slot.range);
        assert!(!slot.range.overlaps(&morning), "{} overlaps busy block", slot.range);
    }

    println!("✅ Suggestions stay inside working hours and skip busy time");
}

#[tokio::test]
async fn test_unknown_participant_is_not_found() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let err = h
        .slots
        .suggest(SuggestSlotsRequest {
            tenant_id: seed.tenant_id,
            required_participants: vec!["nobody".to_string()],
            optional_participants: vec![],
            duration_minutes: 30,
            window_start: None,
            window_end: None,
            limit: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_schedule_delivers_invitation_then_reminder() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let interview = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11)))
        .await
        .unwrap();
    assert_eq!(interview.state, InterviewState::Scheduled);
    assert_eq!(interview.title, "Interview with Casey Candidate");

    let invitations = h.jobs_for(&interview.invitation_subject()).await;
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].state, JobState::Queued);
    assert_eq!(invitations[0].priority, 10);

    let reminders = h.jobs_for(&interview.reminder_subject()).await;
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].schedule_at, Some(at(1, 10) - 60 * MINUTE_MS));

    let mut mailer = MockMailer::new();
    mailer
        .expect_notify()
        .withf(|n| {
            n.kind == NotificationKind::Invitation
                && n.candidate.email == "casey@example.test"
                && n.interviewers.len() == 1
                && n.interviewers[0].name == "Alice"
        })
        .times(1)
        .returning(|_| Ok(()));
    mailer
        .expect_notify()
        .withf(|n| n.kind == NotificationKind::Reminder)
        .times(1)
        .returning(|_| Ok(()));

    let worker = h.worker(NOTIFICATIONS_QUEUE, h.executor(Arc::new(mailer)));

    assert!(worker.process_next_job().await.unwrap(), "invitation is due");
    assert!(
        !worker.process_next_job().await.unwrap(),
        "reminder waits for its schedule_at"
    );
    assert_eq!(
        h.jobs_for(&interview.invitation_subject()).await[0].state,
        JobState::Done
    );

    h.clock.set(at(1, 9));
    assert!(worker.process_next_job().await.unwrap(), "reminder is due");
    assert_eq!(
        h.jobs_for(&interview.reminder_subject()).await[0].state,
        JobState::Done
    );

    println!("✅ Invitation sent immediately, reminder one hour before start");
}

#[tokio::test]
async fn test_booking_rules() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    h.interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11)))
        .await
        .unwrap();

    // Overlaps Alice's interview
    let err = h
        .interviews
        .schedule(booking(
            &seed.tenant_id,
            &seed.candidate,
            &[&seed.alice, &seed.bob],
            at(1, 10) + 30 * MINUTE_MS,
            at(1, 11) + 30 * MINUTE_MS,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    // Bob alone is free
    h.interviews
        .schedule(booking(
            &seed.tenant_id,
            &seed.candidate,
            &[&seed.bob],
            at(1, 10) + 30 * MINUTE_MS,
            at(1, 11) + 30 * MINUTE_MS,
        ))
        .await
        .unwrap();

    // Less than four hours of notice
    let err = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(0, 2), at(0, 3)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);

    // Same interviewer twice
    let err = h
        .interviews
        .schedule(booking(
            &seed.tenant_id,
            &seed.candidate,
            &[&seed.bob, &seed.bob],
            at(2, 10),
            at(2, 11),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);

    println!("✅ Conflicts, notice and duplicate interviewers rejected");
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_slot() {
    let h = Harness::new().await;
    let seed = h.seed().await;
    let request = || booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11));

    let (first, second) = tokio::join!(
        h.interviews.schedule(request()),
        h.interviews.schedule(request())
    );

    let booked = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(booked, 1, "first={:?} second={:?}", first, second);
    let err = first.err().or(second.err()).unwrap();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

    let day = TimeRange::from_bounds(at(1, 0), at(2, 0));
    let active = h
        .interview_repo
        .find_active_for_user(&seed.tenant_id, &seed.alice, day)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    println!("✅ Only one of two racing bookings lands");
}

#[tokio::test]
async fn test_instants_past_year_9999_are_rejected() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let err = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 0), i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(_)), "got {:?}", err);

    let err = h
        .directory
        .add_busy_block(AddBusyBlockRequest {
            tenant_id: seed.tenant_id.clone(),
            user_id: seed.alice.clone(),
            start: i64::MIN + 1,
            end: i64::MAX - 1,
            title: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_cancel_withdraws_pending_notices() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let interview = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11)))
        .await
        .unwrap();

    let cancelled = h
        .interviews
        .cancel(&seed.tenant_id, &interview.id)
        .await
        .unwrap();
    assert_eq!(cancelled.state, InterviewState::Cancelled);

    for subject in [interview.invitation_subject(), interview.reminder_subject()] {
        let jobs = h.jobs_for(&subject).await;
        assert!(jobs.iter().all(|j| j.state == JobState::Cancelled), "{}", subject);
    }
    assert_eq!(h.jobs_for(&interview.cancellation_subject()).await.len(), 1);

    let notifier = Arc::new(RecordingNotifier::new());
    let worker = h.worker(NOTIFICATIONS_QUEUE, h.executor(notifier.clone()));
    while worker.process_next_job().await.unwrap() {}

    let kinds: Vec<_> = notifier.sent().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::Cancellation]);

    // Cancelled is terminal
    assert!(h.interviews.cancel(&seed.tenant_id, &interview.id).await.is_err());

    println!("✅ Cancel drops queued invitation and reminder, sends cancellation");
}

#[tokio::test]
async fn test_reschedule_supersedes_queued_notices() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let interview = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11)))
        .await
        .unwrap();

    let moved = h
        .interviews
        .reschedule(&seed.tenant_id, &interview.id, at(2, 14), at(2, 15))
        .await
        .unwrap();
    assert_eq!(moved.range, TimeRange::from_bounds(at(2, 14), at(2, 15)));

    let invitations = h.jobs_for(&interview.invitation_subject()).await;
    assert_eq!(invitations.len(), 2);
    assert_eq!(invitations[0].state, JobState::Superseded);
    assert_eq!(invitations[1].state, JobState::Queued);

    let reminders = h.jobs_for(&interview.reminder_subject()).await;
    assert_eq!(reminders.len(), 2);
    assert_eq!(reminders[0].state, JobState::Superseded);
    assert_eq!(reminders[1].schedule_at, Some(at(2, 14) - HOUR_MS));

    let notifier = Arc::new(RecordingNotifier::new());
    let worker = h.worker(NOTIFICATIONS_QUEUE, h.executor(notifier.clone()));
    while worker.process_next_job().await.unwrap() {}

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1, "only the latest invitation goes out");
    assert_eq!(sent[0].kind, NotificationKind::Invitation);
    assert_eq!(sent[0].range.start, at(2, 14));

    println!("✅ Reschedule supersedes notices of the old time");
}

#[tokio::test]
async fn test_interview_lifecycle() {
    let h = Harness::new().await;
    let seed = h.seed().await;

    let interview = h
        .interviews
        .schedule(booking(&seed.tenant_id, &seed.candidate, &[&seed.alice], at(1, 10), at(1, 11)))
        .await
        .unwrap();

    let confirmed = h.interviews.confirm(&seed.tenant_id, &interview.id).await.unwrap();
    assert_eq!(confirmed.state, InterviewState::Confirmed);

    // Not over yet
    assert!(h.interviews.complete(&seed.tenant_id, &interview.id).await.is_err());

    h.clock.set(at(1, 12));
    let done = h.interviews.complete(&seed.tenant_id, &interview.id).await.unwrap();
    assert_eq!(done.state, InterviewState::Completed);

    let err = h
        .interviews
        .reschedule(&seed.tenant_id, &interview.id, at(3, 10), at(3, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {:?}", err);

    // Other tenants cannot see it
    let other = h.directory.create_tenant("Globex").await.unwrap();
    let err = h.interviews.get(&other.id, &interview.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);

    println!("✅ Scheduled -> Confirmed -> Completed, tenant isolated");
}
