//! Animation-driven state machine.
//!
//! A [`Move`] is an immutable run of frames shared by every actor of a kind.
//! Each frame names a movement primitive, a distance and an optional hook.
//! [`advance`] executes exactly one frame per think; when the cursor runs past
//! the last frame the move's continuation fires once, and if it does not set a
//! new move the actor holds its final frame.

use std::fmt;

use tracing::trace;

use crate::content::ContentError;
use crate::engine::MonsterWorld;
use crate::entity::ActorHandle;
use crate::monster::ai;

/// Hook run on a frame or when a move completes
pub type FrameFn = fn(&mut MonsterWorld, ActorHandle);

/// Locomotion applied for a frame's distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovePrimitive {
    /// Hold position, look for targets
    Stand,
    /// Patrol toward the current goal
    Walk,
    /// Chase the enemy and consider attacking
    Run,
    /// Close in on the enemy without attack checks
    Charge,
    /// Move along the current facing, no decisions
    Move,
}

#[derive(Clone, Copy)]
pub struct Frame {
    pub primitive: MovePrimitive,
    pub dist: f32,
    pub think: Option<FrameFn>,
}

impl Frame {
    pub const fn new(primitive: MovePrimitive, dist: f32, think: Option<FrameFn>) -> Self {
        Self {
            primitive,
            dist,
            think,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("primitive", &self.primitive)
            .field("dist", &self.dist)
            .field("think", &self.think.is_some())
            .finish()
    }
}

pub struct Move {
    pub name: &'static str,
    pub first_frame: u32,
    pub last_frame: u32,
    pub frames: &'static [Frame],
    pub on_complete: Option<FrameFn>,
}

impl Move {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn contains_frame(&self, frame: u32) -> bool {
        (self.first_frame..=self.last_frame).contains(&frame)
    }

    pub fn frame(&self, frame: u32) -> Option<&Frame> {
        if !self.contains_frame(frame) {
            return None;
        }
        self.frames.get((frame - self.first_frame) as usize)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        if self.last_frame < self.first_frame {
            return Err(ContentError::InvalidFrameRange {
                name: self.name.to_string(),
                first: self.first_frame,
                last: self.last_frame,
            });
        }
        let expected = (self.last_frame - self.first_frame + 1) as usize;
        if expected != self.frames.len() {
            return Err(ContentError::FrameCountMismatch {
                name: self.name.to_string(),
                expected,
                actual: self.frames.len(),
            });
        }
        Ok(())
    }

    /// Identity comparison; moves are shared statics
    pub fn is(&self, other: &Move) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move({} {}..={})",
            self.name, self.first_frame, self.last_frame
        )
    }
}

/// Per-actor position inside the active move
#[derive(Debug, Clone, Default)]
pub struct MoveCursor {
    pub active: Option<&'static Move>,
    /// Last executed frame, so after N advances from a fresh start this is
    /// `first_frame + N - 1`. See [`MoveCursor::next_frame_index`].
    pub frame: u32,
    /// One-shot override for the next executed frame
    pub next_frame: Option<u32>,
    fresh: bool,
    completed: bool,
    generation: u32,
}

impl MoveCursor {
    fn start(&mut self, mv: &'static Move) {
        self.active = Some(mv);
        self.frame = mv.first_frame;
        self.next_frame = None;
        self.fresh = true;
        self.completed = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Bumped every time a move is set, including re-setting the same move
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// True once the continuation has fired and no new move replaced it
    pub fn is_frozen(&self) -> bool {
        self.completed
    }

    pub fn is_playing(&self, mv: &Move) -> bool {
        self.active.is_some_and(|a| a.is(mv))
    }

    /// Frame the next advance will execute. `None` when idle, frozen, or
    /// about to complete the move.
    pub fn next_frame_index(&self) -> Option<u32> {
        let mv = self.active?;
        if let Some(next) = self.next_frame {
            return Some(next);
        }
        if self.fresh {
            Some(mv.first_frame)
        } else if self.completed || self.frame >= mv.last_frame {
            None
        } else {
            Some(self.frame + 1)
        }
    }
}

/// Install `mv` and rewind to its first frame. `None` is a content error and
/// leaves the current move untouched.
pub fn set_animation(world: &mut MonsterWorld, actor: ActorHandle, mv: Option<&'static Move>) {
    let Some(mv) = mv else {
        world.report_content_error(Some(actor), "set_animation called without a move");
        return;
    };
    if let Some(state) = world.monster_mut(actor) {
        trace!(?actor, mv = mv.name, "set animation");
        state.anim.start(mv);
    }
}

enum Step {
    Run {
        mv: &'static Move,
        frame: Frame,
        generation: u32,
        scale: f32,
    },
    Complete {
        mv: &'static Move,
        generation: u32,
    },
    Idle,
    BadFrame(String),
}

/// Execute one frame of the actor's active move
pub fn advance(world: &mut MonsterWorld, actor: ActorHandle) {
    let step = match world.monster_mut(actor) {
        None => return,
        Some(state) => {
            let scale = state.move_scale;
            next_step(&mut state.anim, scale)
        }
    };
    finish(world, actor, step);
}

fn next_step(cursor: &mut MoveCursor, scale: f32) -> Step {
    let Some(mv) = cursor.active else {
        return Step::Idle;
    };

    let index = if let Some(next) = cursor.next_frame.take() {
        if !mv.contains_frame(next) {
            return Step::BadFrame(format!("{} has no frame {}", mv.name, next));
        }
        cursor.completed = false;
        next
    } else if cursor.fresh {
        mv.first_frame
    } else if cursor.completed {
        return Step::Idle;
    } else if cursor.frame < mv.last_frame {
        cursor.frame + 1
    } else {
        cursor.completed = true;
        return Step::Complete {
            mv,
            generation: cursor.generation,
        };
    };

    cursor.fresh = false;
    cursor.frame = index;
    match mv.frame(index) {
        Some(frame) => Step::Run {
            mv,
            frame: *frame,
            generation: cursor.generation,
            scale,
        },
        None => Step::BadFrame(format!("{} is missing frame {}", mv.name, index)),
    }
}

fn finish(world: &mut MonsterWorld, actor: ActorHandle, step: Step) {
    match step {
        Step::Idle => {}
        Step::BadFrame(msg) => world.report_content_error(Some(actor), &msg),
        Step::Complete { mv, generation } => {
            trace!(?actor, mv = mv.name, "move complete");
            if let Some(on_complete) = mv.on_complete {
                on_complete(world, actor);
            }
            // A continuation that installed a new move plays its first frame now
            let replaced = world
                .monster(actor)
                .is_some_and(|s| s.anim.generation != generation);
            if replaced {
                advance(world, actor);
            }
        }
        Step::Run {
            mv,
            frame,
            generation,
            scale,
        } => {
            ai::run_primitive(world, actor, frame.primitive, frame.dist * scale);
            let unchanged = world
                .monster(actor)
                .is_some_and(|s| s.anim.generation == generation);
            if !unchanged {
                trace!(?actor, mv = mv.name, "move replaced during primitive");
                return;
            }
            if let Some(think) = frame.think {
                think(world, actor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FRAMES: [Frame; 3] = [
        Frame::new(MovePrimitive::Stand, 0.0, None),
        Frame::new(MovePrimitive::Stand, 0.0, None),
        Frame::new(MovePrimitive::Stand, 0.0, None),
    ];

    static THREE: Move = Move {
        name: "three",
        first_frame: 4,
        last_frame: 6,
        frames: &FRAMES,
        on_complete: None,
    };

    static INVERTED: Move = Move {
        name: "inverted",
        first_frame: 6,
        last_frame: 4,
        frames: &FRAMES,
        on_complete: None,
    };

    #[test]
    fn test_move_validate() {
        assert!(THREE.validate().is_ok());
        assert!(matches!(
            INVERTED.validate(),
            Err(ContentError::InvalidFrameRange { .. })
        ));
    }

    #[test]
    fn test_move_frame_lookup() {
        assert!(THREE.frame(3).is_none());
        assert!(THREE.frame(4).is_some());
        assert!(THREE.frame(6).is_some());
        assert!(THREE.frame(7).is_none());
        assert_eq!(THREE.frame_count(), 3);
    }

    #[test]
    fn test_cursor_start_bumps_generation() {
        let mut cursor = MoveCursor::default();
        cursor.start(&THREE);
        let g = cursor.generation();
        cursor.start(&THREE);
        assert_eq!(cursor.generation(), g + 1);
        assert_eq!(cursor.frame, 4);
        assert!(cursor.is_playing(&THREE));
        assert!(!cursor.is_frozen());
    }

    #[test]
    fn test_next_frame_index_tracks_advances() {
        let mut cursor = MoveCursor::default();
        assert_eq!(cursor.next_frame_index(), None);
        cursor.start(&THREE);
        assert_eq!(cursor.next_frame_index(), Some(THREE.first_frame));

        for n in 1..=2 {
            assert!(matches!(next_step(&mut cursor, 1.0), Step::Run { .. }));
            assert_eq!(cursor.frame, THREE.first_frame + n - 1);
            assert_eq!(cursor.next_frame_index(), Some(THREE.first_frame + n));
        }

        assert!(matches!(next_step(&mut cursor, 1.0), Step::Run { .. }));
        assert_eq!(cursor.frame, THREE.last_frame);
        assert_eq!(cursor.next_frame_index(), None);
        assert!(matches!(next_step(&mut cursor, 1.0), Step::Complete { .. }));
        assert_eq!(cursor.next_frame_index(), None);

        cursor.next_frame = Some(5);
        assert_eq!(cursor.next_frame_index(), Some(5));
    }
}
