//! # Scheduling Tests
//!
//! 1. **Messages**: self-expiry across runs, tags, senders
//! 2. **Timing**: per-frame averages for inline and threaded systems
//! 3. **Systems**: registered systems under the mutable contract
//! 4. **Configuration**: TOML-driven engines
//!
//! Run with: cargo test -p fastecs --test scheduling

use std::time::Duration;

use fastecs::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Health(u32);
impl Component for Health {
    const ID: ComponentId = 1;
}

#[derive(Clone, Debug, PartialEq)]
enum Event {
    Damage { target: EntityId, amount: u32 },
    Log(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Damage {
    target: EntityId,
    amount: u32,
}

impl MessageKind<Event> for Damage {
    fn extract(message: &Event) -> Option<Self> {
        match *message {
            Event::Damage { target, amount } => Some(Self { target, amount }),
            Event::Log(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct World {
    tick: u32,
}

fn engine(threading: Threading) -> Engine<World, Event> {
    EngineBuilder::new(World::default())
        .threading(threading)
        .component_debug::<Health>()
        .global_debug()
        .build()
        .unwrap()
}

// ============================================================================
// MESSAGES
// ============================================================================

#[test]
fn test_self_expiry_scenario() {
    let engine = engine(Threading::Single);

    engine.run_st("sys1", |view| view.post(Event::Log("hello")));
    let seen_by_sys2 = engine.run_st("sys2", |view| view.messages::<Event>());
    let seen_by_sys1 = engine.run_st("sys1", |view| view.messages::<Event>());

    assert_eq!(seen_by_sys2, vec![Event::Log("hello")]);
    assert!(seen_by_sys1.is_empty());
    assert_eq!(engine.message_queue_size(), 0);
}

#[test]
fn test_self_expiry_across_parallel_phases() {
    let engine = engine(Threading::Multi);

    engine.phase(|phase| phase.run_mt("sys1", |view| view.post(Event::Log("frame 1"))));
    let seen = engine.phase(|phase| {
        phase.run_mt("sys2", |view| assert_eq!(view.message_queue_size(), 1));
        phase.join();
        phase.engine().messages::<Event>()
    });
    assert_eq!(seen, vec![Event::Log("frame 1")]);

    engine.phase(|phase| {
        phase.run_mt("sys1", |view| assert_eq!(view.message_queue_size(), 0));
    });
}

#[test]
fn test_tagged_reads_and_clears() {
    let mut engine = engine(Threading::Single);
    let target = engine.create_entity().unwrap();

    engine.run_st("combat", |view| {
        view.post(Event::Damage { target, amount: 5 });
        view.post(Event::Log("swing"));
        view.post(Event::Damage { target, amount: 7 });
    });
    engine.run_st("narrator", |view| view.post(Event::Log("meanwhile")));

    let hits = engine.messages::<Damage>();
    assert_eq!(hits.iter().map(|d| d.amount).sum::<u32>(), 12);
    assert_eq!(engine.messages_from::<Event>("narrator"), vec![Event::Log("meanwhile")]);
    assert!(engine.messages_from::<Event>("nobody").is_empty());

    assert_eq!(engine.pop_messages::<Damage>().len(), 2);
    assert_eq!(engine.message_queue_size(), 2);

    engine.clear_messages_from("combat");
    assert_eq!(engine.messages::<Event>(), vec![Event::Log("meanwhile")]);

    engine.clear_messages_of::<Event>();
    assert_eq!(engine.message_queue_size(), 0);
}

#[test]
fn test_messages_cross_the_phase_boundary() {
    let mut engine = engine(Threading::Multi);
    let ids: Vec<_> = (0..3).map(|_| engine.create_entity().unwrap()).collect();
    for &id in &ids {
        engine.add(id, Health(10)).unwrap();
    }

    engine.phase(|phase| {
        phase.run_mt("ai", |view| {
            for id in view.entities::<(Health,)>().unwrap() {
                view.post(Event::Damage { target: id, amount: 3 });
            }
        });
    });

    engine
        .run_mutable("apply", |engine| {
            for hit in engine.pop_messages::<Damage>() {
                engine.modify::<Health, _>(hit.target, |h| h.0 -= hit.amount)?;
            }
            engine.global_mut().tick += 1;
            Ok::<_, EcsError>(())
        })
        .unwrap();

    for &id in &ids {
        assert_eq!(engine.get::<Health>(id).unwrap(), Health(7));
    }
    assert_eq!(engine.global().tick, 1);
    assert_eq!(engine.debug_global(), "{ World { tick: 1 } }");
}

// ============================================================================
// TIMING
// ============================================================================

#[test]
fn test_averages_divide_by_frames() {
    const FRAMES: u32 = 4;
    let engine = engine(Threading::Multi);

    for _ in 0..FRAMES {
        engine.start_frame();
        engine.run_st("steady", |_| std::thread::sleep(Duration::from_millis(5)));
        engine.phase(|phase| {
            phase.run_mt("worker", |_| std::thread::sleep(Duration::from_millis(5)));
        });
    }
    assert_eq!(engine.frames(), FRAMES);

    let st = engine.timer_st();
    let names: Vec<_> = st.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["steady", "multithreaded"]);
    for report in &st {
        assert!(report.average >= Duration::from_millis(5), "{report:?}");
        assert!(report.average < Duration::from_millis(100), "{report:?}");
    }

    let mt = engine.timer_mt();
    assert_eq!(mt.len(), 1);
    assert!(mt[0].average >= Duration::from_millis(5));

    engine.reset_timer();
    assert_eq!(engine.frames(), 0);
    assert!(engine.timer_mt().is_empty());
}

// ============================================================================
// SYSTEMS
// ============================================================================

struct Regen {
    amount: u32,
    runs: u32,
}

impl System<World, Event> for Regen {
    fn run(&mut self, engine: &mut Engine<World, Event>) -> EcsResult<()> {
        self.runs += 1;
        let amount = self.amount;
        engine.for_each_mut::<(Health,)>(|_, (h,)| h.0 += amount)?;
        engine.post(Event::Log("regen"));
        Ok(())
    }
}

struct Faulty;

impl System<World, Event> for Faulty {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn run(&mut self, engine: &mut Engine<World, Event>) -> EcsResult<()> {
        let id = engine.create_entity()?;
        engine.remove_entity(id)?;
        engine.get::<Health>(id).map(|_| ())
    }
}

#[test]
fn test_registered_systems() {
    let mut engine = engine(Threading::Single);
    let id = engine.create_entity().unwrap();
    engine.add(id, Health(1)).unwrap();

    engine.add_system(Regen { amount: 2, runs: 0 }).unwrap();
    assert!(matches!(
        engine.add_system(Regen { amount: 9, runs: 0 }),
        Err(EcsError::DuplicateSystem(_))
    ));

    engine.run_system::<Regen>().unwrap();
    engine.run_system::<Regen>().unwrap();

    assert_eq!(engine.get::<Health>(id).unwrap(), Health(5));
    assert_eq!(engine.system::<Regen>().unwrap().runs, 2);
    assert_eq!(engine.messages_from::<Event>("Regen"), vec![Event::Log("regen")]);
    assert_eq!(engine.timer_st()[0].name, "Regen");

    engine.system_mut::<Regen>().unwrap().amount = 0;
    assert_eq!(engine.remove_system::<Regen>().unwrap().amount, 0);
    assert!(matches!(
        engine.run_system::<Regen>(),
        Err(EcsError::SystemNotFound(_))
    ));
}

#[test]
fn test_system_errors_propagate() {
    let mut engine = engine(Threading::Single);
    engine.add_system(Faulty).unwrap();

    assert!(matches!(
        engine.run_system::<Faulty>(),
        Err(EcsError::EntityNotFound(_))
    ));
    assert!(engine.system::<Faulty>().is_some());
    assert_eq!(engine.timer_st()[0].name, "faulty");
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_engine_from_toml() {
    let config = EngineConfig::from_toml_str(
        r#"
        threading = "single"
        compaction_threshold = 0.1

        [layout]
        entity_length = "u16"
        component_length = "u8"
        type_id = "u8"
        "#,
    )
    .unwrap();

    let mut engine: Engine<World, Event, PackedStore> = EngineBuilder::new(World::default())
        .config(config)
        .component::<Health>()
        .build()
        .unwrap();
    assert_eq!(engine.config().threading, Threading::Single);

    let id = engine.create_entity().unwrap();
    engine.add(id, Health(3)).unwrap();
    assert_eq!(engine.get::<Health>(id).unwrap(), Health(3));

    engine.set_threading(Threading::Multi);
    assert_eq!(engine.config().threading, Threading::Multi);
}
