//! Integration tests for the fixed-step simulation driver
//!
//! The tokio clock is paused so virtual time advances deterministically.

use async_trait::async_trait;
use game_server::simulation;
use game_server::{EntityId, World, WorldError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Default)]
struct StepLog {
    steps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl World for StepLog {
    async fn despawn_entity(&self, _entity: EntityId) -> Result<(), WorldError> {
        Ok(())
    }

    async fn update_step(&self, step: Duration) {
        self.steps.lock().push(step);
    }
}

/// A world whose every update takes far longer than the step.
#[derive(Default)]
struct SlowWorld {
    steps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl World for SlowWorld {
    async fn despawn_entity(&self, _entity: EntityId) -> Result<(), WorldError> {
        Ok(())
    }

    async fn update_step(&self, step: Duration) {
        self.steps.lock().push(step);
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn one_second_runs_about_one_hundred_fixed_steps() {
    let world = Arc::new(StepLog::default());
    let (shutdown, receiver) = broadcast::channel(1);
    let task = tokio::spawn(simulation::run(
        world.clone(),
        Duration::from_millis(10),
        Duration::from_millis(500),
        receiver,
    ));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    shutdown.send(()).unwrap();
    task.await.unwrap();

    let steps = world.steps.lock();
    assert!((99..=101).contains(&steps.len()), "ran {} steps", steps.len());
    assert!(steps.iter().all(|step| *step == Duration::from_millis(10)));
}

#[tokio::test(start_paused = true)]
async fn overload_never_runs_more_than_the_backlog_at_once() {
    let world = Arc::new(SlowWorld::default());
    let (shutdown, receiver) = broadcast::channel(1);
    let task = tokio::spawn(simulation::run(
        world.clone(),
        Duration::from_millis(10),
        Duration::from_millis(500),
        receiver,
    ));

    // First step at 10ms takes 2s; the next measurement is clamped to 50 steps
    tokio::time::sleep(Duration::from_millis(2015)).await;
    shutdown.send(()).unwrap();
    task.await.unwrap();

    let steps = world.steps.lock();
    assert!(steps.len() <= 1 + 50, "ran {} steps", steps.len());
    assert!(steps.iter().all(|step| *step == Duration::from_millis(10)));
}

#[tokio::test]
async fn stops_when_shutdown_sender_is_dropped() {
    let world = Arc::new(StepLog::default());
    let (shutdown, receiver) = broadcast::channel::<()>(1);
    let task = tokio::spawn(simulation::run(
        world,
        Duration::from_millis(10),
        Duration::from_millis(500),
        receiver,
    ));

    drop(shutdown);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("simulation did not stop")
        .unwrap();
}
