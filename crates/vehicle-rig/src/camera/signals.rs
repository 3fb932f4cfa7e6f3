//! Camera input: discrete signals and analog deltas.
//!
//! Device mapping happens in the host. The camera only sees which signals are
//! active and how far the pointer moved since the previous frame.

use bitflags::bitflags;

bitflags! {
    /// Discrete camera control signals active this frame.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SignalSet: u16 {
        /// Move toward the target.
        const FORWARD = 1 << 0;
        /// Move away from the target.
        const BACK = 1 << 1;
        /// Orbit upward.
        const ORBIT_UP = 1 << 2;
        /// Orbit downward.
        const ORBIT_DOWN = 1 << 3;
        /// Orbit clockwise, seen from above.
        const ORBIT_CW = 1 << 4;
        /// Orbit counter-clockwise, seen from above.
        const ORBIT_CCW = 1 << 5;
        /// See through obstructions.
        const XRAY = 1 << 6;
        /// Narrow the field of view.
        const ZOOM_IN = 1 << 7;
        /// Widen the field of view.
        const ZOOM_OUT = 1 << 8;
        /// Pointer drag is orbiting the camera.
        const DRAG_TO_ORBIT = 1 << 9;
    }
}

impl SignalSet {
    /// `+1` if only `positive` is active, `-1` if only `negative` is, else 0.
    #[must_use]
    pub fn axis(self, positive: Self, negative: Self) -> i8 {
        i8::from(self.contains(positive)) - i8::from(self.contains(negative))
    }
}

/// Continuous input accumulated between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnalogDeltas {
    /// Pitch, radians at unit zoom. Positive raises the camera.
    pub pitch: f32,
    /// Yaw, radians at unit zoom. Positive turns the camera counter-clockwise seen from above.
    pub yaw: f32,
    /// Zoom wheel steps. Positive widens the field of view.
    pub zoom: f32,
}

impl AnalogDeltas {
    /// Add a pointer or wheel event.
    pub fn accumulate(&mut self, pitch: f32, yaw: f32, zoom: f32) {
        self.pitch += pitch;
        self.yaw += yaw;
        self.zoom += zoom;
    }

    /// Return the accumulated deltas and reset them to zero.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Everything the camera reads from the user in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInput {
    pub signals: SignalSet,
    pub analog: AnalogDeltas,
}

impl CameraInput {
    /// Input with the given signals and no analog motion.
    #[must_use]
    pub fn with_signals(signals: SignalSet) -> Self {
        Self {
            signals,
            analog: AnalogDeltas::default(),
        }
    }
}
