//! Named transition catalog.
//!
//! Each [`TransitionDescriptor`] pairs a leave phase with an enter phase. All
//! numeric parameters are fixed here; hosts only turn a [`PhasePlan`] into
//! an actual animation.
//!
//! | name         | leave/enter ms | easing                  | leave to                  | enter from               |
//! |--------------|----------------|-------------------------|---------------------------|--------------------------|
//! | `fade`       | 300 / 300      | (0.4, 0, 0.2, 1)        | opacity 0                 | opacity 0                |
//! | `slide-left` | 350 / 350      | (0.65, 0, 0.35, 1)      | opacity 0, x -60px        | opacity 0, x 60px        |
//! | `slide-up`   | 350 / 400      | (0.22, 1, 0.36, 1)      | opacity 0, y -40px        | opacity 0, y 40px        |
//! | `zoom`       | 300 / 350      | (0.34, 1.56, 0.64, 1)   | opacity 0, scale 0.92     | opacity 0, scale 1.06    |
//! | `blur`       | 350 / 350      | (0.4, 0, 0.2, 1)        | opacity 0, blur 12px      | opacity 0, blur 12px     |
//! | `curtain`    | 450 / 450      | (0.76, 0, 0.24, 1)      | opacity 0, y -24px, blur 4px | opacity 0, y 24px, blur 4px |
//!
//! Every enter phase ends at [`VisualState::REST`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::easing::{lerp_f32, CubicBezier};

/// The animated visual properties of a content container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub opacity: f32,
    /// Horizontal offset in px.
    pub translate_x: f32,
    /// Vertical offset in px.
    pub translate_y: f32,
    pub scale: f32,
    /// Blur radius in px.
    pub blur: f32,
}

impl VisualState {
    /// Fully visible, untransformed.
    pub const REST: VisualState = VisualState {
        opacity: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        blur: 0.0,
    };

    const fn hidden() -> Self {
        Self {
            opacity: 0.0,
            ..Self::REST
        }
    }

    const fn shifted(x: f32, y: f32) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            ..Self::hidden()
        }
    }

    const fn scaled(scale: f32) -> Self {
        Self {
            scale,
            ..Self::hidden()
        }
    }

    const fn blurred(y: f32, blur: f32) -> Self {
        Self {
            translate_y: y,
            blur,
            ..Self::hidden()
        }
    }

    pub fn lerp(&self, other: &VisualState, t: f32) -> VisualState {
        VisualState {
            opacity: lerp_f32(self.opacity, other.opacity, t),
            translate_x: lerp_f32(self.translate_x, other.translate_x, t),
            translate_y: lerp_f32(self.translate_y, other.translate_y, t),
            scale: lerp_f32(self.scale, other.scale, t),
            blur: lerp_f32(self.blur, other.blur, t),
        }
    }

    pub fn is_rest(&self) -> bool {
        *self == Self::REST
    }

    /// CSS `transform` value.
    pub fn css_transform(&self) -> String {
        if self.translate_x == 0.0 && self.translate_y == 0.0 && self.scale == 1.0 {
            return "none".to_string();
        }
        format!(
            "translate({}px, {}px) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }

    /// CSS `filter` value.
    pub fn css_filter(&self) -> String {
        if self.blur == 0.0 {
            "none".to_string()
        } else {
            format!("blur({}px)", self.blur)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionName {
    Fade,
    SlideLeft,
    SlideUp,
    Zoom,
    Blur,
    Curtain,
}

impl TransitionName {
    /// Catalog order; the `cycle` pick policy walks this list.
    pub const ALL: [TransitionName; 6] = [
        Self::Fade,
        Self::SlideLeft,
        Self::SlideUp,
        Self::Zoom,
        Self::Blur,
        Self::Curtain,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::SlideLeft => "slide-left",
            Self::SlideUp => "slide-up",
            Self::Zoom => "zoom",
            Self::Blur => "blur",
            Self::Curtain => "curtain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|n| n.as_str().eq_ignore_ascii_case(s))
    }

    #[inline]
    pub fn descriptor(&self) -> &'static TransitionDescriptor {
        TransitionDescriptor::lookup(*self)
    }
}

impl fmt::Display for TransitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Leave,
    Enter,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::Enter => "enter",
        }
    }
}

/// Static parameters of one half of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseSpec {
    pub duration_ms: u32,
    pub easing: CubicBezier,
    pub from: VisualState,
    pub to: VisualState,
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionDescriptor {
    pub name: TransitionName,
    pub leave: PhaseSpec,
    pub enter: PhaseSpec,
}

const fn leave(duration_ms: u32, easing: CubicBezier, to: VisualState) -> PhaseSpec {
    PhaseSpec {
        duration_ms,
        easing,
        from: VisualState::REST,
        to,
    }
}

const fn enter(duration_ms: u32, easing: CubicBezier, from: VisualState) -> PhaseSpec {
    PhaseSpec {
        duration_ms,
        easing,
        from,
        to: VisualState::REST,
    }
}

static CATALOG: [TransitionDescriptor; 6] = [
    TransitionDescriptor {
        name: TransitionName::Fade,
        leave: leave(300, CubicBezier::STANDARD, VisualState::hidden()),
        enter: enter(300, CubicBezier::STANDARD, VisualState::hidden()),
    },
    TransitionDescriptor {
        name: TransitionName::SlideLeft,
        leave: leave(
            350,
            CubicBezier::new(0.65, 0.0, 0.35, 1.0),
            VisualState::shifted(-60.0, 0.0),
        ),
        enter: enter(
            350,
            CubicBezier::new(0.65, 0.0, 0.35, 1.0),
            VisualState::shifted(60.0, 0.0),
        ),
    },
    TransitionDescriptor {
        name: TransitionName::SlideUp,
        leave: leave(
            350,
            CubicBezier::new(0.22, 1.0, 0.36, 1.0),
            VisualState::shifted(0.0, -40.0),
        ),
        enter: enter(
            400,
            CubicBezier::new(0.22, 1.0, 0.36, 1.0),
            VisualState::shifted(0.0, 40.0),
        ),
    },
    TransitionDescriptor {
        name: TransitionName::Zoom,
        leave: leave(
            300,
            CubicBezier::new(0.34, 1.56, 0.64, 1.0),
            VisualState::scaled(0.92),
        ),
        enter: enter(
            350,
            CubicBezier::new(0.34, 1.56, 0.64, 1.0),
            VisualState::scaled(1.06),
        ),
    },
    TransitionDescriptor {
        name: TransitionName::Blur,
        leave: leave(350, CubicBezier::STANDARD, VisualState::blurred(0.0, 12.0)),
        enter: enter(350, CubicBezier::STANDARD, VisualState::blurred(0.0, 12.0)),
    },
    TransitionDescriptor {
        name: TransitionName::Curtain,
        leave: leave(
            450,
            CubicBezier::new(0.76, 0.0, 0.24, 1.0),
            VisualState::blurred(-24.0, 4.0),
        ),
        enter: enter(
            450,
            CubicBezier::new(0.76, 0.0, 0.24, 1.0),
            VisualState::blurred(24.0, 4.0),
        ),
    },
];

impl TransitionDescriptor {
    pub fn lookup(name: TransitionName) -> &'static TransitionDescriptor {
        match CATALOG.iter().find(|d| d.name == name) {
            Some(d) => d,
            None => &CATALOG[0],
        }
    }

    pub fn all() -> &'static [TransitionDescriptor] {
        &CATALOG
    }

    pub fn leave_plan(&self, reduced_motion: bool) -> PhasePlan {
        PhasePlan::new(self.name, PhaseKind::Leave, &self.leave, reduced_motion)
    }

    pub fn enter_plan(&self, reduced_motion: bool) -> PhasePlan {
        PhasePlan::new(self.name, PhaseKind::Enter, &self.enter, reduced_motion)
    }
}

/// A phase resolved for one call: either the animated variant or the
/// instant variant used under reduced motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhasePlan {
    pub transition: TransitionName,
    pub kind: PhaseKind,
    pub duration_ms: u32,
    pub easing: CubicBezier,
    pub from: VisualState,
    pub to: VisualState,
}

impl PhasePlan {
    fn new(transition: TransitionName, kind: PhaseKind, spec: &PhaseSpec, reduced: bool) -> Self {
        if reduced {
            return Self {
                transition,
                kind,
                duration_ms: 0,
                easing: CubicBezier::LINEAR,
                from: spec.to,
                to: spec.to,
            };
        }
        Self {
            transition,
            kind,
            duration_ms: spec.duration_ms,
            easing: spec.easing,
            from: spec.from,
            to: spec.to,
        }
    }

    #[inline]
    pub fn is_instant(&self) -> bool {
        self.duration_ms == 0
    }

    /// Visual state `elapsed_ms` into the phase. Clamps to the terminal state.
    pub fn sample(&self, elapsed_ms: f32) -> VisualState {
        if self.is_instant() || elapsed_ms >= self.duration_ms as f32 {
            return self.to;
        }
        let t = (elapsed_ms / self.duration_ms as f32).max(0.0);
        self.from.lerp(&self.to, self.easing.ease(t))
    }

    /// The state the container must be left in once the phase is over,
    /// whether the animation succeeded or not.
    #[inline]
    pub fn terminal(&self) -> VisualState {
        self.to
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.transition, self.kind.as_str())
    }
}
