//! Built-in demo scene used when no template file is given.
//!
//! Two rows of pawns march towards each other while a car patrols the
//! middle of the board and a rook waits for the host to move it.

use boardsim::components::attributes::AttrValue;
use boardsim::error::CallbackResult;
use boardsim::resources::templatestore::Cue;
use boardsim::{
    AnimationState, Behavior, BehaviorCtx, Coord, Flow, MovementType, ObjectSnapshot,
    ObjectTemplate, PieceColor, Simulation, TemplateStore,
};
use log::info;

const PAWN_STEP_SECONDS: f32 = 1.0;
const CAR_STEP_SECONDS: f32 = 0.5;

pub fn templates() -> TemplateStore {
    let run_over = Cue {
        sound: Some("brakes".to_string()),
        effect: Some("skid_marks".to_string()),
    };
    TemplateStore::new()
        .with(
            ObjectTemplate::piece("white_pawn", MovementType::Pawn, PieceColor::White)
                .with_cue(AnimationState::HitByCar, run_over.clone()),
        )
        .with(
            ObjectTemplate::piece("black_pawn", MovementType::Pawn, PieceColor::Black)
                .with_cue(AnimationState::HitByCar, run_over),
        )
        .with(ObjectTemplate::piece("white_rook", MovementType::Rook, PieceColor::White))
        .with(ObjectTemplate::hazard("car", AnimationState::HitByCar))
}

pub fn register_behaviors(sim: &mut Simulation) {
    sim.register_behavior("white_pawn", |_| Advance);
    sim.register_behavior("black_pawn", |_| Advance);
    sim.register_behavior("car", |_| Patrol { step: 1 });
}

/// Lay out the demo board.
pub fn populate(sim: &mut Simulation) {
    let (width, height) = sim.board_dimensions();
    for x in (0..width).step_by(2) {
        spawn_or_log(sim, "white_pawn", (x, 1));
        spawn_or_log(sim, "black_pawn", (x + 1, height - 2));
    }
    spawn_or_log(sim, "white_rook", (0, 0));
    spawn_or_log(sim, "car", (0, height / 2));
}

fn spawn_or_log(sim: &mut Simulation, template: &str, at: (i32, i32)) {
    if let Err(err) = sim.spawn(template, at, None) {
        log::warn!("demo: cannot spawn {} at {:?}: {}", template, at, err);
    }
}

/// Steps a pawn forward once per second until it is blocked.
struct Advance;

impl Behavior for Advance {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        let Some(me) = ctx.me() else {
            return Ok(Flow::Done);
        };
        let Some(dir) = me.color.and_then(|c| c.forward()) else {
            return Ok(Flow::Done);
        };
        let to = Coord::new(me.position.x, me.position.y + dir);
        if ctx.move_object(me.position, to) {
            let steps = match ctx.attribute("steps") {
                Some(AttrValue::Integer(n)) => n + 1,
                _ => 1,
            };
            ctx.set_attribute("steps", AttrValue::Integer(steps));
        }
        Ok(Flow::wait(PAWN_STEP_SECONDS, |_| Ok(Flow::Done)))
    }

    fn collision(&mut self, ctx: &mut BehaviorCtx<'_>, other: &ObjectSnapshot) -> CallbackResult<Flow> {
        ctx.show_message(format!("pawn {} ran into {}", ctx.id(), other.template), Some(1.5));
        Ok(Flow::Done)
    }

    fn destroy(&mut self, ctx: &mut BehaviorCtx<'_>) -> CallbackResult<()> {
        info!("pawn {} leaves the board", ctx.id());
        Ok(())
    }
}

/// Drives back and forth along its row, bouncing off the board edges.
struct Patrol {
    step: i32,
}

impl Behavior for Patrol {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>, _dt: f32) -> CallbackResult<Flow> {
        let Some(me) = ctx.me() else {
            return Ok(Flow::Done);
        };
        let from = me.position;
        let mut to = Coord::new(from.x + self.step, from.y);
        if !ctx.in_bounds(to) {
            self.step = -self.step;
            to = Coord::new(from.x + self.step, from.y);
        }
        ctx.move_object(from, to);
        Ok(Flow::wait(CAR_STEP_SECONDS, |_| Ok(Flow::Done)))
    }

    fn collision(&mut self, ctx: &mut BehaviorCtx<'_>, _other: &ObjectSnapshot) -> CallbackResult<Flow> {
        ctx.play_sound("horn");
        Ok(Flow::Done)
    }
}
