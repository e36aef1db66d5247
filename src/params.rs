use crate::error::ContactSolverError;

/// The ten scalar knobs of the relaxed-rigid impedance/friction law.
///
/// All fields are plain `f64`s so the whole struct is `Copy` and hashable
/// by the bit pattern of its fields, matching the source model's
/// `__hash__`/`__eq__` override (it needs to be usable as a cache key by
/// an embedding application).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactParams {
    /// Constraint-stabilization time scale Ω. Must be >= 0.
    pub time_constant: f64,
    /// Dimensionless damping ratio ζ. Must be > 0.
    pub damping_coefficient: f64,
    /// Minimum impedance ξ_min. Must satisfy `0 <= d_min <= d_max`.
    pub d_min: f64,
    /// Maximum impedance ξ_max. Must satisfy `d_min <= d_max <= 1`.
    pub d_max: f64,
    /// Width of the impedance sigmoid. Must be > 0.
    pub width: f64,
    /// Midpoint of the impedance sigmoid, in (0, 1).
    pub midpoint: f64,
    /// Power exponent of the impedance sigmoid.
    ///
    /// The source does not guard against `power < 1`: with `midpoint` in
    /// (0, 1) the `x^(p-1)` term in the denominator stays finite, but the
    /// sigmoid's shape can invert. Callers should keep `power >= 1`.
    pub power: f64,
    /// Explicit stiffness override. Negative values are used as `-K_cfg`;
    /// non-negative values mean "derive stiffness from (Ω, ζ, ξ_max)".
    pub stiffness: f64,
    /// Explicit damping override, same negative/non-negative convention
    /// as `stiffness`.
    pub damping: f64,
    /// Coulomb friction coefficient μ. Must be >= 0.
    pub mu: f64,
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            time_constant: 0.01,
            damping_coefficient: 1.0,
            d_min: 0.9,
            d_max: 0.95,
            width: 1e-4,
            midpoint: 0.1,
            power: 1.0,
            stiffness: 0.0,
            damping: 0.0,
            mu: 0.5,
        }
    }
}

impl Eq for ContactParams {}

impl std::hash::Hash for ContactParams {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for field in [
            self.time_constant,
            self.damping_coefficient,
            self.d_min,
            self.d_max,
            self.width,
            self.midpoint,
            self.power,
            self.stiffness,
            self.damping,
            self.mu,
        ] {
            field.to_bits().hash(state);
        }
    }
}

impl ContactParams {
    /// Returns a builder seeded with the defaults, for fluent field-by-field
    /// construction.
    pub fn builder() -> ContactParamsBuilder {
        ContactParamsBuilder::default()
    }

    /// Validates the ranges documented on each field.
    pub fn valid(&self) -> bool {
        self.time_constant >= 0.0
            && self.damping_coefficient > 0.0
            && self.d_min >= 0.0
            && self.d_max <= 1.0
            && self.d_min <= self.d_max
            && self.width > 0.0
            && self.midpoint > 0.0
            && self.midpoint < 1.0
            && self.power >= 0.0
            && self.mu >= 0.0
    }

    /// Validates `self`, returning a [`ContactSolverError::InvalidParams`]
    /// describing the first violated constraint.
    pub fn validated(self) -> Result<Self, ContactSolverError> {
        let reason = if self.time_constant < 0.0 {
            Some("time_constant must be >= 0")
        } else if self.damping_coefficient <= 0.0 {
            Some("damping_coefficient must be > 0")
        } else if self.d_min < 0.0 {
            Some("d_min must be >= 0")
        } else if self.d_max > 1.0 {
            Some("d_max must be <= 1")
        } else if self.d_min > self.d_max {
            Some("d_min must be <= d_max")
        } else if self.width <= 0.0 {
            Some("width must be > 0")
        } else if !(self.midpoint > 0.0 && self.midpoint < 1.0) {
            Some("midpoint must be in (0, 1)")
        } else if self.power < 0.0 {
            Some("power must be >= 0")
        } else if self.mu < 0.0 {
            Some("mu must be >= 0")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ContactSolverError::InvalidParams { reason }),
            None => Ok(self),
        }
    }
}

/// Fluent builder for [`ContactParams`], mirroring the teacher's
/// field-by-field `Settings` construction style.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactParamsBuilder {
    params: ContactParamsOverrides,
}

#[derive(Debug, Clone, Copy, Default)]
struct ContactParamsOverrides {
    time_constant: Option<f64>,
    damping_coefficient: Option<f64>,
    d_min: Option<f64>,
    d_max: Option<f64>,
    width: Option<f64>,
    midpoint: Option<f64>,
    power: Option<f64>,
    stiffness: Option<f64>,
    damping: Option<f64>,
    mu: Option<f64>,
}

macro_rules! builder_field {
    ($name:ident) => {
        pub fn $name(mut self, value: f64) -> Self {
            self.params.$name = Some(value);
            self
        }
    };
}

impl ContactParamsBuilder {
    builder_field!(time_constant);
    builder_field!(damping_coefficient);
    builder_field!(d_min);
    builder_field!(d_max);
    builder_field!(width);
    builder_field!(midpoint);
    builder_field!(power);
    builder_field!(stiffness);
    builder_field!(damping);
    builder_field!(mu);

    /// Builds the [`ContactParams`], validating it against [`ContactParams::valid`].
    pub fn build(self) -> Result<ContactParams, ContactSolverError> {
        let defaults = ContactParams::default();
        let p = self.params;
        ContactParams {
            time_constant: p.time_constant.unwrap_or(defaults.time_constant),
            damping_coefficient: p
                .damping_coefficient
                .unwrap_or(defaults.damping_coefficient),
            d_min: p.d_min.unwrap_or(defaults.d_min),
            d_max: p.d_max.unwrap_or(defaults.d_max),
            width: p.width.unwrap_or(defaults.width),
            midpoint: p.midpoint.unwrap_or(defaults.midpoint),
            power: p.power.unwrap_or(defaults.power),
            stiffness: p.stiffness.unwrap_or(defaults.stiffness),
            damping: p.damping.unwrap_or(defaults.damping),
            mu: p.mu.unwrap_or(defaults.mu),
        }
        .validated()
    }
}
