//! Integration tests: coupling task lifetimes to entities.

use skein_arena::{ArenaError, DespawnHook, EntityArray};
use skein_core::{Entity, EntityKind};
use skein_engine::{ArgBlock, EventKind, TaskContext, WaitOutcome};
use skein_test_utils::{run_frames, runtime, Boss, Enemy, Journal, Laser, Marker, Projectile};

/// Reads the runtime from its destructor.
struct Flare {
    ctx: TaskContext,
    journal: Journal<u64>,
}

impl Entity for Flare {
    const KIND: EntityKind = EntityKind::Generic;
}

impl Drop for Flare {
    fn drop(&mut self) {
        self.journal.push(self.ctx.frame().0);
    }
}

#[test]
fn despawning_a_bound_entity_cancels_the_task() {
    let mut rt = runtime();
    let enemy = rt.with_world(|w| w.spawn(Enemy { hp: 3 }));
    let journal = Journal::new();
    let j = journal.clone();
    let patrol = rt.invoke_with("patrol", (), move |ctx, _| async move {
        ctx.bind(enemy);
        let jf = j.clone();
        ctx.set_finalizer(move || jf.push("finalized"));
        loop {
            ctx.yield_now().await;
            j.push("tick");
        }
    });
    run_frames(&mut rt, 2);
    assert_eq!(journal.take(), vec!["tick", "tick"]);

    let gone = rt.with_world(|w| w.despawn(enemy)).unwrap();
    assert_eq!(journal.entries(), vec!["finalized"]);
    assert!(!rt.is_task_alive(patrol));
    assert_eq!(gone.kind, EntityKind::Enemy);
    assert_eq!(gone.downcast::<Enemy>(), Some(Enemy { hp: 3 }));
}

#[test]
fn binding_a_dead_entity_cancels_immediately() {
    let mut rt = runtime();
    let laser = rt.with_world(|w| w.spawn(Laser { length: 12.0 }));
    rt.with_world(|w| w.despawn(laser)).unwrap();

    let journal = Journal::new();
    let j = journal.clone();
    let h = rt.invoke_with("sweep", (), move |ctx, _| async move {
        ctx.bind(laser);
        j.push(ctx.is_canceled());
        ctx.yield_now().await;
        j.push(false);
    });
    assert_eq!(journal.entries(), vec![true]);
    assert!(!rt.is_task_alive(h));
    assert_eq!(rt.task_count(), 0);
}

#[test]
fn finished_task_releases_its_binding() {
    let mut rt = runtime();
    let enemy = rt.with_world(|w| w.spawn(Enemy { hp: 1 }));
    rt.invoke_with("brief", (), move |ctx, _| async move {
        ctx.bind(enemy);
        ctx.yield_now().await;
    });
    rt.run_frame();
    assert_eq!(rt.task_count(), 0);

    let gone = rt.with_world(|w| w.despawn(enemy)).unwrap();
    assert!(gone.hooks.is_empty());
}

#[test]
fn bound_entity_hooks_name_the_task() {
    let mut rt = runtime();
    let enemy = rt.with_world(|w| w.spawn(Enemy { hp: 1 }));
    let h = rt.invoke_with("watcher", (), move |ctx, _| async move {
        ctx.bind(enemy);
        ctx.stall().await;
    });
    let gone = rt.with_world(|w| w.despawn(enemy)).unwrap();
    assert_eq!(gone.hooks.as_slice(), &[DespawnHook::CancelTask(h.0)]);
}

#[test]
#[should_panic(expected = "already bound")]
fn binding_twice_panics() {
    let mut rt = runtime();
    let (a, b) = rt.with_world(|w| (w.spawn(Enemy { hp: 1 }), w.spawn(Enemy { hp: 2 })));
    rt.invoke_with("greedy", (), move |ctx, _| async move {
        ctx.bind(a);
        ctx.bind(b);
    });
}

#[test]
fn hosted_entities_die_with_their_host() {
    let mut rt = runtime();
    let hosted = Journal::new();
    let out = hosted.clone();
    let gun = rt.invoke_with("gun", (), move |ctx, _| async move {
        for i in 0..3 {
            out.push(ctx.host_entity(Projectile::at(i as f32, 0.0)));
            ctx.yield_now().await;
        }
        ctx.stall().await;
    });
    run_frames(&mut rt, 3);
    let shots = hosted.entries();
    assert_eq!(shots.len(), 3);
    assert_eq!(rt.with_world(|w| w.arena().len()), 3);

    // Gameplay may remove a hosted entity first.
    rt.with_world(|w| w.despawn(shots[1])).unwrap();

    rt.cancel(gun);
    rt.with_world(|w| {
        assert!(shots.iter().all(|s| !w.is_alive(*s)));
        assert!(w.arena().is_empty());
    });
}

#[test]
fn entity_events_cancel_on_despawn_and_reject_dead_entities() {
    let mut rt = runtime();
    let marker = rt.with_world(|w| w.spawn(Marker(7)));
    let journal = Journal::new();
    let j = journal.clone();
    rt.invoke_with("spotter", (), move |ctx, _| async move {
        let seen = ctx
            .with_world(|w| w.entity_event(marker, EventKind::Repeatable))
            .unwrap();
        j.push(ctx.wait_event(seen).await);
    });
    rt.run_frame();
    assert!(journal.is_empty());

    rt.with_world(|w| w.despawn(marker)).unwrap();
    assert_eq!(journal.entries(), vec![WaitOutcome::Canceled]);
    assert_eq!(
        rt.with_world(|w| w.entity_event(marker, EventKind::OneShot)),
        None
    );
}

#[test]
fn entity_array_tracks_a_hosted_wave() {
    let mut rt = runtime();
    let wave = ArgBlock::new(EntityArray::<Enemy>::new(8));
    let host = rt.invoke_with("wave", wave.clone(), |ctx, arr| async move {
        let arr = arr.get();
        for hp in 1..=4 {
            let e = ctx.host_entity(Enemy { hp });
            arr.with_mut(|a| a.add(e)).unwrap();
        }
        ctx.stall().await;
    });

    rt.with_world(|w| {
        let (first, third) = wave.with(|a| (a.get_boxed(0), a.get_boxed(2)));
        w.despawn(first.unwrap()).unwrap();
        w.despawn(third.unwrap()).unwrap();
    });

    let removed = rt.with_world(|w| wave.with_mut(|a| a.compact(w.arena())));
    assert_eq!(removed, 2);
    rt.with_world(|w| wave.with(|a| w.for_each_mut(a, |e| e.hp *= 10)));
    let mut hps = Vec::new();
    rt.with_world(|w| wave.with(|a| a.for_each(w.arena(), |e| hps.push(e.hp))));
    assert_eq!(hps, vec![20, 40]);

    rt.cancel(host);
    let live = rt.with_world(|w| wave.with(|a| a.iter_live(w.arena()).count()));
    assert_eq!(live, 0);
}

#[test]
#[should_panic(expected = "despawned twice")]
fn despawning_twice_panics() {
    let mut rt = runtime();
    let boss = rt.with_world(|w| {
        w.spawn(Boss {
            name: "twin",
            hp: 1,
        })
    });
    rt.with_world(|w| w.despawn(boss)).unwrap();
    let _ = rt.with_world(|w| w.despawn(boss));
}

#[test]
fn despawning_through_a_reused_slot_is_stale() {
    let mut rt = runtime();
    let old = rt.with_world(|w| w.spawn(Enemy { hp: 1 }));
    rt.with_world(|w| w.despawn(old)).unwrap();
    let new = rt.with_world(|w| w.spawn(Enemy { hp: 2 }));
    let err = rt.with_world(|w| w.despawn(old)).err();
    assert_eq!(err, Some(ArenaError::StaleReference { key: old.key() }));
    assert!(rt.with_world(|w| w.is_alive(new)));
}

#[test]
fn hosting_through_a_reclaimed_context_spawns_nothing_live() {
    let mut rt = runtime();
    let kept = Journal::new();
    let k = kept.clone();
    let h = rt.invoke_with("brief", (), move |ctx, _| async move {
        k.push(ctx.clone());
    });
    assert!(!rt.is_task_alive(h));

    let ctx = kept.take().pop().unwrap();
    let shot = ctx.host_entity(Projectile::at(1.0, 1.0));
    let events = ctx.host_events(2, EventKind::Repeatable);
    rt.with_world(|w| {
        assert!(!w.is_alive(shot));
        assert!(w.arena().is_empty());
    });
    for e in events {
        assert!(!rt.signal(e));
    }
}

#[test]
fn entity_destructors_may_read_the_runtime() {
    let mut rt = runtime();
    let journal = Journal::new();
    let j = journal.clone();
    let host = rt.invoke_with("flares", (), move |ctx, _| async move {
        ctx.host_entity(Flare {
            ctx: ctx.clone(),
            journal: j.clone(),
        });
        let loose = Flare {
            ctx: ctx.clone(),
            journal: j,
        };
        ctx.with_world(|w| w.spawn(loose));
        ctx.stall().await;
    });
    rt.run_frame();

    // Hosted flare goes with its task; the loose one survives until teardown.
    rt.cancel(host);
    assert_eq!(journal.entries(), vec![1]);
    assert_eq!(rt.with_world(|w| w.arena().len()), 1);
    rt.finish();
    assert_eq!(journal.entries(), vec![1, 1]);
}
