// PID compensator for the simulated plant. Pure computation; the caller
// supplies the fixed logical time step.

pub struct PIDController {
    // Gains
    kp: f64,
    ki: f64,
    kd: f64,

    // State
    integral: f64,
    prev_error: f64,
}

impl PIDController {
    // Anti-windup bound on the integral term. Hard limit, not configurable.
    pub const INTEGRAL_LIMIT: f64 = 10.0;

    // Below this step the derivative is suppressed rather than divided by a
    // near-zero dt.
    const MIN_DT: f64 = 1e-6;

    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    // Gains are re-applied before every update so live tuning takes effect
    // on the next tick without touching the accumulated state.
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    pub fn update(&mut self, setpoint: f64, measured: f64, dt: f64) -> f64 {
        let error = setpoint - measured;

        // Integral term with anti-windup
        self.integral += error * dt;
        self.integral = self.integral.clamp(-Self::INTEGRAL_LIMIT, Self::INTEGRAL_LIMIT);

        // Derivative term
        let derivative = if dt > Self::MIN_DT {
            (error - self.prev_error) / dt
        } else {
            0.0
        };

        self.prev_error = error;

        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}
