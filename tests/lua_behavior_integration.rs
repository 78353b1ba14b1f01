//! Lua behavior integration tests: coroutine waits, move requests, collision
//! callbacks and the scoped `engine` table.

#![cfg(feature = "lua")]

use boardsim::components::attributes::AttrValue;
use boardsim::resources::scheduler::TaskState;
use boardsim::{
    AnimationState, Coord, EffectCmd, MoveError, MoveOutcome, MovementType, ObjectId,
    ObjectTemplate, PieceColor, SimConfig, Simulation, TemplateStore,
};

const DT: f32 = 0.5;

fn templates() -> TemplateStore {
    TemplateStore::new()
        .with(ObjectTemplate::piece("white_pawn", MovementType::Pawn, PieceColor::White))
        .with(ObjectTemplate::piece("black_pawn", MovementType::Pawn, PieceColor::Black))
        .with(ObjectTemplate::piece("white_rook", MovementType::Rook, PieceColor::White))
        .with(ObjectTemplate::piece("jumper", MovementType::Custom, PieceColor::White))
        .with(ObjectTemplate::hazard("car", AnimationState::HitByCar))
}

fn make_sim() -> Simulation {
    Simulation::new(SimConfig::new(), templates())
}

fn run(sim: &mut Simulation, ticks: u32) {
    for _ in 0..ticks {
        sim.tick(DT);
    }
}

fn attr(sim: &Simulation, id: ObjectId, key: &str) -> Option<AttrValue> {
    sim.get(id)?.attributes.get(key).cloned()
}

/// Lua numbers come back as integers or floats depending on their value.
fn number(value: Option<AttrValue>) -> Option<f64> {
    match value? {
        AttrValue::Integer(i) => Some(i as f64),
        AttrValue::Scalar(n) => Some(n),
        _ => None,
    }
}

fn text(value: &str) -> Option<AttrValue> {
    Some(AttrValue::Text(value.to_string()))
}

#[test]
fn init_can_wait_on_the_simulated_clock() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "white_rook",
        "sleeper.lua",
        r#"
        local s = {}
        function s.init()
            engine.set_attribute("phase", "waiting")
            engine.wait(2.0)
            engine.set_attribute("phase", "done")
            engine.set_attribute("woke_at", engine.now())
        end
        return s
        "#,
    )
    .unwrap();
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();
    assert_eq!(attr(&sim, id, "phase"), text("waiting"));
    assert_eq!(sim.task_state(id), Some(TaskState::Suspended));

    run(&mut sim, 3);
    assert_eq!(attr(&sim, id, "phase"), text("waiting"));

    run(&mut sim, 1);
    assert_eq!(attr(&sim, id, "phase"), text("done"));
    assert_eq!(number(attr(&sim, id, "woke_at")), Some(2.0));
    assert_eq!(sim.task_state(id), Some(TaskState::Running));
}

#[test]
fn destroy_before_wake_up_drops_the_coroutine() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "white_rook",
        "sleeper.lua",
        r#"
        local s = {}
        function s.init()
            engine.wait(2.0)
            engine.play_sound("woke")
        end
        function s.destroy()
            engine.play_sound("bye")
        end
        return s
        "#,
    )
    .unwrap();
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();
    run(&mut sim, 2);
    sim.destroy(id);
    run(&mut sim, 6);

    let effects = sim.drain_effects();
    assert!(effects.contains(&EffectCmd::PlaySound {
        id: "bye".to_string()
    }));
    assert!(!effects.contains(&EffectCmd::PlaySound {
        id: "woke".to_string()
    }));
}

#[test]
fn update_moves_and_waits() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "car",
        "car.lua",
        r#"
        local car = {}
        function car.update(dt)
            local me = engine.get(engine.self_id())
            engine.move(me.x, me.y, me.x + 1, me.y)
            engine.wait(1.0)
        end
        return car
        "#,
    )
    .unwrap();
    let car = sim.spawn("car", (0, 4), None).unwrap();

    // t=0.5 moves, then sleeps until t=1.5
    run(&mut sim, 1);
    assert_eq!(sim.get(car).unwrap().position, Coord::new(1, 4));
    run(&mut sim, 1);
    assert_eq!(sim.get(car).unwrap().position, Coord::new(1, 4));
    // t=1.5 wakes up and updates again
    run(&mut sim, 1);
    assert_eq!(sim.get(car).unwrap().position, Coord::new(2, 4));
}

#[test]
fn script_state_is_per_object() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "white_rook",
        "counter.lua",
        r#"
        local count = 0
        local s = {}
        function s.update(dt)
            count = count + 1
            engine.set_attribute("count", count)
        end
        return s
        "#,
    )
    .unwrap();
    let a = sim.spawn("white_rook", (0, 0), None).unwrap();
    run(&mut sim, 2);
    let b = sim.spawn("white_rook", (7, 7), None).unwrap();
    run(&mut sim, 1);

    assert_eq!(number(attr(&sim, a, "count")), Some(3.0));
    assert_eq!(number(attr(&sim, b, "count")), Some(1.0));
}

const CORNER_JUMPER: &str = r#"
local j = {}
function j.move_request(fx, fy, tx, ty)
    return { {0, 0}, {7, 0}, {0, 7}, {x = 7, y = 7} }
end
function j.get_valid_moves(x, y)
    return { {0, 0}, {7, 7} }
end
return j
"#;

#[test]
fn move_request_returns_a_move_list() {
    let mut sim = make_sim();
    sim.register_lua_behavior("jumper", "jumper.lua", CORNER_JUMPER)
        .unwrap();
    let id = sim.spawn("jumper", (3, 3), None).unwrap();

    assert_eq!(
        sim.request_move(id, (3, 3), (4, 4)),
        MoveOutcome::Rejected(MoveError::IllegalMove {
            from: Coord::new(3, 3),
            to: Coord::new(4, 4)
        })
    );
    assert!(sim.request_move(id, (3, 3), (7, 7)).is_accepted());
    assert!(sim.request_move(id, (7, 7), (0, 7)).is_accepted());
    assert_eq!(sim.occupant_at((0, 7)), Some(id));
    assert_eq!(
        sim.valid_moves((0, 7)),
        vec![Coord::new(0, 0), Coord::new(7, 7)]
    );
}

#[test]
fn custom_piece_script_moves_itself() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "jumper",
        "roamer.lua",
        r#"
        local r = { done = false }
        function r.move_request(fx, fy, tx, ty)
            return false
        end
        function r.update(dt)
            if r.done then return end
            r.done = true
            local me = engine.get(engine.self_id())
            engine.set_attribute("moved", engine.move(me.x, me.y, 7, 7))
        end
        return r
        "#,
    )
    .unwrap();
    let id = sim.spawn("jumper", (0, 0), None).unwrap();

    run(&mut sim, 1);
    assert_eq!(attr(&sim, id, "moved"), Some(AttrValue::Flag(true)));
    assert_eq!(sim.occupant_at((7, 7)), Some(id));
    assert_eq!(sim.task_state(id), Some(TaskState::Running));
}

#[test]
fn move_request_accepts_booleans_and_names() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "jumper",
        "picky.lua",
        r#"
        local p = {}
        function p.move_request(fx, fy, tx, ty)
            if tx == fx then return true end
            if ty == fy then return "allow" end
            if tx == ty then return "reject" end
            return false
        end
        return p
        "#,
    )
    .unwrap();
    let id = sim.spawn("jumper", (3, 3), None).unwrap();

    assert!(sim.request_move(id, (3, 3), (3, 6)).is_accepted());
    assert!(sim.request_move(id, (3, 6), (0, 6)).is_accepted());
    assert!(!sim.request_move(id, (0, 6), (1, 1)).is_accepted());
    assert!(!sim.request_move(id, (0, 6), (2, 1)).is_accepted());
    assert_eq!(sim.occupant_at((0, 6)), Some(id));
}

#[test]
fn waiting_inside_move_request_is_a_fault() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "jumper",
        "sleepy.lua",
        r#"
        local s = {}
        function s.move_request(fx, fy, tx, ty)
            engine.wait(1.0)
            return true
        end
        return s
        "#,
    )
    .unwrap();
    let id = sim.spawn("jumper", (3, 3), None).unwrap();
    assert!(matches!(
        sim.request_move(id, (3, 3), (3, 4)),
        MoveOutcome::Rejected(MoveError::BehaviorFault {
            callback: "move_request",
            ..
        })
    ));
    assert_eq!(sim.occupant_at((3, 3)), Some(id));
}

#[test]
fn collision_callback_can_cancel() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "black_pawn",
        "stubborn.lua",
        r#"
        local s = {}
        function s.collision(other)
            engine.set_attribute("hit_by", other.template)
            engine.cancel_collision()
        end
        return s
        "#,
    )
    .unwrap();
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pawn = sim.spawn("black_pawn", (0, 6), None).unwrap();

    assert!(matches!(
        sim.request_move(rook, (0, 0), (0, 6)),
        MoveOutcome::Collided(boardsim::events::collision::CollisionOutcome::Cancelled)
    ));
    assert_eq!(attr(&sim, pawn, "hit_by"), text("white_rook"));
    assert!(sim.get(pawn).unwrap().is_active());
}

#[test]
fn nested_callbacks_restore_the_engine_table() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "black_pawn",
        "victim.lua",
        r#"
        local v = {}
        function v.collision(other)
            engine.set_attribute("seen_self", engine.self_id())
        end
        return v
        "#,
    )
    .unwrap();
    sim.register_lua_behavior(
        "white_rook",
        "charger.lua",
        r#"
        local c = { done = false }
        function c.update(dt)
            if c.done then return end
            c.done = true
            engine.set_attribute("captured", engine.move(0, 0, 0, 6))
            engine.set_attribute("after", engine.self_id())
        end
        return c
        "#,
    )
    .unwrap();
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();
    let pawn = sim.spawn("black_pawn", (0, 6), None).unwrap();

    run(&mut sim, 1);
    assert_eq!(attr(&sim, rook, "captured"), Some(AttrValue::Flag(true)));
    assert_eq!(number(attr(&sim, rook, "after")), Some(rook.0 as f64));
    assert_eq!(number(attr(&sim, pawn, "seen_self")), Some(pawn.0 as f64));
    assert_eq!(sim.occupant_at((0, 6)), Some(rook));
}

#[test]
fn script_errors_fault_only_their_task() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "car",
        "broken.lua",
        r#"
        local b = {}
        function b.update(dt)
            error("engine trouble")
        end
        return b
        "#,
    )
    .unwrap();
    sim.register_lua_behavior(
        "white_rook",
        "counter.lua",
        r#"
        local s = { n = 0 }
        function s.update(dt)
            s.n = s.n + 1
            engine.set_attribute("n", s.n)
        end
        return s
        "#,
    )
    .unwrap();
    let car = sim.spawn("car", (5, 5), None).unwrap();
    let rook = sim.spawn("white_rook", (0, 0), None).unwrap();

    run(&mut sim, 3);
    assert_eq!(sim.task_state(car), Some(TaskState::Finished));
    assert_eq!(number(attr(&sim, rook, "n")), Some(3.0));
}

#[test]
fn engine_table_reaches_the_board() {
    let mut sim = make_sim();
    sim.register_lua_behavior(
        "white_rook",
        "board_query.lua",
        r#"
        local p = {}
        function p.init()
            local w, h = engine.board_dimensions()
            engine.set_attribute("width", w)
            engine.set_attribute("in_bounds", engine.in_bounds(w, h))
            engine.set_attribute("neighbour", engine.occupant_at(1, 0) ~= nil)
            local id, err = engine.spawn("black_pawn", 2, 0)
            engine.set_attribute("spawned", id ~= nil and err == nil)
            local dup, dup_err = engine.spawn("black_pawn", 2, 0)
            engine.set_attribute("dup_failed", dup == nil and dup_err ~= nil)
            local _, bad_color = engine.spawn("black_pawn", 3, 0, "purple")
            engine.set_attribute("bad_color", bad_color ~= nil)
            engine.spawn_effect("sparkle", 2, 0)
            engine.show_message("hello")
        end
        return p
        "#,
    )
    .unwrap();
    sim.spawn("white_pawn", (1, 0), None).unwrap();
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();

    assert_eq!(number(attr(&sim, id, "width")), Some(8.0));
    assert_eq!(attr(&sim, id, "in_bounds"), Some(AttrValue::Flag(false)));
    assert_eq!(attr(&sim, id, "neighbour"), Some(AttrValue::Flag(true)));
    assert_eq!(attr(&sim, id, "spawned"), Some(AttrValue::Flag(true)));
    assert_eq!(attr(&sim, id, "dup_failed"), Some(AttrValue::Flag(true)));
    assert_eq!(attr(&sim, id, "bad_color"), Some(AttrValue::Flag(true)));
    assert!(sim.occupant_at((2, 0)).is_some());
    assert_eq!(sim.occupant_at((3, 0)), None);

    let effects = sim.drain_effects();
    assert!(effects.contains(&EffectCmd::SpawnEffect {
        id: "sparkle".to_string(),
        at: Coord::new(2, 0)
    }));
    assert!(effects.contains(&EffectCmd::ShowMessage {
        text: "hello".to_string(),
        duration: None
    }));
}

#[test]
fn invalid_scripts_are_rejected_at_registration() {
    let mut sim = make_sim();
    assert!(
        sim.register_lua_behavior("white_rook", "broken.lua", "return {")
            .is_err()
    );
    assert!(
        sim.register_lua_behavior("white_rook", "not_a_table.lua", "return 42")
            .is_err()
    );
    // no factory was registered, so the rook falls back to the inert behavior
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();
    assert_eq!(sim.task_state(id), Some(TaskState::Running));
}

#[test]
fn failed_per_object_load_falls_back_to_an_inert_behavior() {
    let mut sim = make_sim();
    // runs cleanly at registration, then fails for every spawned object
    sim.register_lua_behavior(
        "white_rook",
        "once.lua",
        r#"
        loads = (loads or 0) + 1
        if loads > 1 then error("loaded twice") end
        local s = {}
        function s.init() engine.set_attribute("ran", true) end
        function s.update(dt) engine.set_attribute("ran", true) end
        return s
        "#,
    )
    .unwrap();
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();
    run(&mut sim, 2);

    assert_eq!(attr(&sim, id, "ran"), None);
    assert_eq!(sim.task_state(id), Some(TaskState::Running));
    assert!(sim.request_move(id, (0, 0), (0, 3)).is_accepted());
}

#[test]
fn scripts_load_from_files() {
    let path = std::env::temp_dir().join(format!("boardsim_lua_{}.lua", std::process::id()));
    std::fs::write(
        &path,
        "local s = {}\nfunction s.init() engine.set_attribute('loaded', true) end\nreturn s\n",
    )
    .unwrap();

    let mut sim = make_sim();
    sim.register_lua_script("white_rook", &path).unwrap();
    let id = sim.spawn("white_rook", (0, 0), None).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(attr(&sim, id, "loaded"), Some(AttrValue::Flag(true)));
}
