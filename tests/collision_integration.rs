//! Collision resolver integration tests: callback order, default outcomes,
//! cancellation and deferred removal.

use std::cell::RefCell;
use std::rc::Rc;

use boardsim::error::BoardError;
use boardsim::events::collision::CollisionOutcome;
use boardsim::resources::templatestore::Cue;
use boardsim::{
    AnimationState, Behavior, BehaviorCtx, CallbackError, CallbackResult, Coord, EffectCmd, Flow,
    MoveError, MoveOutcome, MovementType, ObjectSnapshot, ObjectTemplate, PieceColor, SimConfig,
    Simulation, TemplateStore,
};

const DT: f32 = 0.5;

type Log = Rc<RefCell<Vec<String>>>;

fn templates() -> TemplateStore {
    TemplateStore::new()
        .with(
            ObjectTemplate::piece("white_pawn", MovementType::Pawn, PieceColor::White).with_cue(
                AnimationState::HitByCar,
                Cue {
                    sound: Some("splat".to_string()),
                    effect: Some("dust".to_string()),
                },
            ),
        )
        .with(ObjectTemplate::piece("black_pawn", MovementType::Pawn, PieceColor::Black))
        .with(ObjectTemplate::piece("white_rook", MovementType::Rook, PieceColor::White))
        .with(
            ObjectTemplate::piece("black_dragon", MovementType::Queen, PieceColor::Black)
                .with_hit_kind(AnimationState::Burning),
        )
        .with(ObjectTemplate::hazard("car", AnimationState::HitByCar))
        .with(ObjectTemplate::hazard("pit", AnimationState::Drowning))
}

fn make_sim() -> Simulation {
    Simulation::new(SimConfig::new(), templates())
}

fn run(sim: &mut Simulation, ticks: u32) {
    for _ in 0..ticks {
        sim.tick(DT);
    }
}

/// Logs `<name>:<other template>` for every collision it sees.
struct Witness {
    name: &'static str,
    log: Log,
    cancel: bool,
}

impl Behavior for Witness {
    fn collision(&mut self, ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, other.template));
        if self.cancel {
            ctx.cancel_collision();
        }
        Ok(Flow::Done)
    }
}

fn witness(sim: &mut Simulation, template: &'static str, log: &Log, cancel: bool) {
    let log = log.clone();
    sim.register_behavior(template, move |_| Witness {
        name: template,
        log: log.clone(),
        cancel,
    });
}

#[test]
fn hazard_hits_piece_defender_first_then_removal_after_animation() {
    let mut sim = make_sim();
    let log: Log = Rc::default();
    witness(&mut sim, "white_pawn", &log, false);
    witness(&mut sim, "car", &log, false);

    let pawn = sim.spawn("white_pawn", (3, 3), None).unwrap();
    let car = sim.spawn("car", (2, 3), None).unwrap();

    assert!(!sim.move_object((2, 3), (3, 3)));
    assert!(log.borrow().is_empty());

    // t=0.5: contact resolved
    run(&mut sim, 1);
    assert_eq!(*log.borrow(), vec!["white_pawn:car", "car:white_pawn"]);
    let dying = sim.get(pawn).unwrap();
    assert_eq!(dying.animation, AnimationState::HitByCar);
    assert!(!dying.is_active());
    assert_eq!(sim.get(car).unwrap().position, Coord::new(2, 3));

    // while dying the pawn keeps its cell but is no target
    assert_eq!(sim.occupant_at((3, 3)), Some(pawn));
    assert_eq!(
        sim.spawn("black_pawn", (3, 3), None),
        Err(BoardError::Occupied(Coord::new(3, 3)))
    );
    let dragon = sim.spawn("black_dragon", (3, 0), None).unwrap();
    assert_eq!(
        sim.request_move(dragon, (3, 0), (3, 3)),
        MoveOutcome::Rejected(MoveError::Occupied(Coord::new(3, 3)))
    );

    // hitbycar lasts 1.0s by default: still there at t=1.0
    run(&mut sim, 1);
    assert!(sim.get(pawn).is_some());

    // gone at t=1.5
    run(&mut sim, 1);
    assert!(sim.get(pawn).is_none());
    assert_eq!(sim.occupant_at((3, 3)), None);
    assert!(
        sim.drain_effects()
            .contains(&EffectCmd::ObjectRemoved { object: pawn })
    );
}

#[test]
fn death_state_fires_the_victims_cues() {
    let mut sim = make_sim();
    let pawn = sim.spawn("white_pawn", (3, 3), None).unwrap();
    sim.spawn("car", (2, 3), None).unwrap();
    sim.drain_effects();

    sim.move_object((2, 3), (3, 3));
    run(&mut sim, 1);
    assert_eq!(
        sim.drain_effects(),
        vec![
            EffectCmd::AnimationChanged {
                object: pawn,
                state: AnimationState::HitByCar
            },
            EffectCmd::PlaySound {
                id: "splat".to_string()
            },
            EffectCmd::SpawnEffect {
                id: "dust".to_string(),
                at: Coord::new(3, 3)
            },
        ]
    );
}

#[test]
fn piece_moving_onto_hazard_dies_in_place() {
    let mut sim = make_sim();
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pit = sim.spawn("pit", (0, 4), None).unwrap();

    assert_eq!(
        sim.request_move(rook, (0, 0), (0, 4)),
        MoveOutcome::Collided(CollisionOutcome::Destroyed {
            victim: rook,
            by: pit,
            state: AnimationState::Drowning,
        })
    );
    assert_eq!(sim.occupant_at((0, 0)), Some(rook));
    assert_eq!(sim.occupant_at((0, 4)), Some(pit));

    // drowning lasts 1.5s
    run(&mut sim, 2);
    assert!(sim.get(rook).is_some());
    run(&mut sim, 1);
    assert!(sim.get(rook).is_none());
    assert!(sim.get(pit).is_some());
}

#[test]
fn capture_frees_the_cell_at_once() {
    let mut sim = make_sim();
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let victim = sim.spawn("black_pawn", (0, 6), None).unwrap();

    assert_eq!(
        sim.request_move(rook, (0, 0), (0, 6)),
        MoveOutcome::Collided(CollisionOutcome::Captured {
            attacker: rook,
            defender: victim,
            state: AnimationState::Captured,
        })
    );
    assert_eq!(sim.occupant_at((0, 6)), Some(rook));
    assert_eq!(sim.get(victim).unwrap().animation, AnimationState::Captured);

    // captured lasts 0.5s
    run(&mut sim, 1);
    assert!(sim.get(victim).is_none());
    assert_eq!(sim.occupant_at((0, 6)), Some(rook));
}

#[test]
fn attacker_hit_kind_overrides_capture_state() {
    let mut sim = make_sim();
    let dragon = sim.spawn("black_dragon", (4, 7), None).unwrap();
    let victim = sim.spawn("white_pawn", (4, 1), None).unwrap();

    let outcome = sim.request_move(dragon, (4, 7), (4, 1));
    assert!(matches!(
        outcome,
        MoveOutcome::Collided(CollisionOutcome::Captured { state: AnimationState::Burning, .. })
    ));
    assert_eq!(sim.get(victim).unwrap().animation, AnimationState::Burning);
}

#[test]
fn defender_can_cancel_the_outcome() {
    let mut sim = make_sim();
    let log: Log = Rc::default();
    witness(&mut sim, "black_pawn", &log, true);
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pawn = sim.spawn("black_pawn", (0, 5), None).unwrap();

    assert_eq!(
        sim.request_move(rook, (0, 0), (0, 5)),
        MoveOutcome::Collided(CollisionOutcome::Cancelled)
    );
    assert_eq!(*log.borrow(), vec!["black_pawn:white_rook"]);
    assert_eq!(sim.occupant_at((0, 0)), Some(rook));
    // the validator accepted the move, but the rook never left its cell
    let replay = sim.request_move(rook, (0, 0), (0, 5));
    assert!(replay.is_accepted());
    assert!(!replay.arrived());
    assert_eq!(sim.occupant_at((0, 5)), Some(pawn));
    assert!(sim.get(pawn).unwrap().is_active());
}

#[test]
fn attacker_can_cancel_a_contact() {
    let mut sim = make_sim();
    let log: Log = Rc::default();
    witness(&mut sim, "car", &log, true);
    let pawn = sim.spawn("white_pawn", (3, 3), None).unwrap();
    sim.spawn("car", (2, 3), None).unwrap();

    sim.move_object((2, 3), (3, 3));
    run(&mut sim, 1);
    assert_eq!(*log.borrow(), vec!["car:white_pawn"]);
    assert!(sim.get(pawn).unwrap().is_active());
}

/// Drives one cell to the right during its first update.
struct Driver {
    log: Log,
    driven: bool,
}

impl Behavior for Driver {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        if self.driven {
            return Ok(Flow::Done);
        }
        self.driven = true;
        self.log.borrow_mut().push("car update".to_string());
        if let Some(at) = ctx.me().map(|s| s.position) {
            ctx.move_object(at, Coord::new(at.x + 1, at.y));
        }
        Ok(Flow::Done)
    }

    fn collision(&mut self, _ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        self.log
            .borrow_mut()
            .push(format!("car hit {}", other.template));
        Ok(Flow::Done)
    }
}

/// Reports whether it is still active on every update.
struct Bystander {
    log: Log,
}

impl Behavior for Bystander {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        let active = ctx.me().is_some_and(|s| s.is_active());
        self.log
            .borrow_mut()
            .push(format!("pawn update active={active}"));
        Ok(Flow::Done)
    }

    fn collision(&mut self, _ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        self.log
            .borrow_mut()
            .push(format!("pawn hit by {}", other.template));
        Ok(Flow::Done)
    }
}

#[test]
fn contacts_resolve_after_every_update_of_the_tick() {
    let mut sim = make_sim();
    let log: Log = Rc::default();
    let (car_log, pawn_log) = (log.clone(), log.clone());
    sim.register_behavior("car", move |_| Driver {
        log: car_log.clone(),
        driven: false,
    });
    sim.register_behavior("white_pawn", move |_| Bystander {
        log: pawn_log.clone(),
    });
    // the car updates first and drives into the pawn
    sim.spawn("car", (0, 4), None).unwrap();
    let pawn = sim.spawn("white_pawn", (1, 4), None).unwrap();

    run(&mut sim, 1);
    assert_eq!(
        *log.borrow(),
        vec![
            "car update",
            "pawn update active=true",
            "pawn hit by car",
            "car hit white_pawn",
        ]
    );
    assert_eq!(sim.get(pawn).unwrap().animation, AnimationState::HitByCar);
}

/// Gets out of the way by destroying itself when hit.
struct Vanish;

impl Behavior for Vanish {
    fn collision(&mut self, ctx: &mut BehaviorCtx<'_>, _other: &ObjectSnapshot) -> CallbackResult<Flow> {
        let me = ctx.id();
        ctx.destroy(me);
        Ok(Flow::Done)
    }
}

#[test]
fn attacker_enters_when_defender_vanishes() {
    let mut sim = make_sim();
    sim.register_behavior("black_pawn", |_| Vanish);
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pawn = sim.spawn("black_pawn", (0, 5), None).unwrap();

    assert_eq!(
        sim.request_move(rook, (0, 0), (0, 5)),
        MoveOutcome::Collided(CollisionOutcome::Entered { attacker: rook })
    );
    assert!(sim.get(pawn).is_none());
    assert_eq!(sim.occupant_at((0, 5)), Some(rook));
}

/// Fails whenever it is hit.
struct Brittle;

impl Behavior for Brittle {
    fn collision(&mut self, _ctx: &mut BehaviorCtx<'_>, _other: &ObjectSnapshot) -> CallbackResult<Flow> {
        Err(CallbackError::new("shattered"))
    }
}

#[test]
fn faulting_defender_still_gets_removed() {
    let mut sim = make_sim();
    sim.register_behavior("white_pawn", |_| Brittle);
    let pawn = sim.spawn("white_pawn", (3, 3), None).unwrap();
    sim.spawn("car", (2, 3), None).unwrap();

    sim.move_object((2, 3), (3, 3));
    run(&mut sim, 1);
    assert_eq!(sim.get(pawn).unwrap().animation, AnimationState::HitByCar);

    run(&mut sim, 2);
    assert!(sim.get(pawn).is_none());
}

#[test]
fn stale_contacts_are_dropped() {
    let mut sim = make_sim();
    let pawn = sim.spawn("white_pawn", (3, 1), None).unwrap();
    sim.spawn("car", (2, 1), None).unwrap();

    sim.move_object((2, 1), (3, 1));
    assert!(sim.request_move(pawn, (3, 1), (3, 2)).is_accepted());
    run(&mut sim, 1);
    assert!(sim.get(pawn).unwrap().is_active());
}

#[test]
fn hazards_block_each_other() {
    let mut sim = make_sim();
    let car = sim.spawn("car", (2, 1), None).unwrap();
    let pit = sim.spawn("pit", (3, 1), None).unwrap();
    sim.drain_effects();

    sim.move_object((2, 1), (3, 1));
    run(&mut sim, 1);
    assert!(sim.get(car).unwrap().is_active());
    assert!(sim.get(pit).unwrap().is_active());
    assert!(sim.drain_effects().is_empty());
}

/// Captures the enemy straight ahead during its first update and logs
/// when its own collision callback arrives.
struct Charger {
    log: Log,
    charged: bool,
}

impl Behavior for Charger {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        if !self.charged {
            self.charged = true;
            ctx.move_object((0, 0), (0, 5));
            self.log.borrow_mut().push("charge done".to_string());
        }
        Ok(Flow::Done)
    }

    fn collision(&mut self, _ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        self.log
            .borrow_mut()
            .push(format!("white_rook:{}", other.template));
        Ok(Flow::Done)
    }
}

#[test]
fn busy_attacker_gets_its_collision_after_returning() {
    let mut sim = make_sim();
    let log: Log = Rc::default();
    witness(&mut sim, "black_pawn", &log, false);
    let shared = log.clone();
    sim.register_behavior("white_rook", move |_| Charger {
        log: shared.clone(),
        charged: false,
    });
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pawn = sim.spawn("black_pawn", (0, 5), None).unwrap();

    run(&mut sim, 1);
    assert_eq!(
        *log.borrow(),
        vec!["black_pawn:white_rook", "charge done", "white_rook:black_pawn"]
    );
    assert_eq!(sim.occupant_at((0, 5)), Some(rook));
    assert!(!sim.get(pawn).unwrap().is_active());
}

#[test]
fn configured_durations_control_removal() {
    let mut config = SimConfig::new();
    config
        .animation_durations
        .insert("hitbycar".to_string(), 0.0);
    let mut sim = Simulation::new(config, templates());
    let pawn = sim.spawn("white_pawn", (3, 3), None).unwrap();
    sim.spawn("car", (2, 3), None).unwrap();

    sim.move_object((2, 3), (3, 3));
    run(&mut sim, 1);
    assert!(sim.get(pawn).is_some());
    run(&mut sim, 1);
    assert!(sim.get(pawn).is_none());
}

#[test]
fn template_durations_beat_the_config() {
    let mut store = templates();
    store.insert(
        ObjectTemplate::piece("slow_pawn", MovementType::Pawn, PieceColor::White)
            .with_duration(AnimationState::HitByCar, 3.0),
    );
    let mut sim = Simulation::new(SimConfig::new(), store);
    let pawn = sim.spawn("slow_pawn", (3, 3), None).unwrap();
    sim.spawn("car", (2, 3), None).unwrap();

    sim.move_object((2, 3), (3, 3));
    // hit at t=0.5, removal due at t=3.5
    run(&mut sim, 6);
    assert!(sim.get(pawn).is_some());
    run(&mut sim, 1);
    assert!(sim.get(pawn).is_none());
}
