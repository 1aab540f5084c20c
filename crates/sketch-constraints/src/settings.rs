/// Starting value and open interval of an auxiliary curve parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParamSettings {
    pub initial: f64,
    /// Exclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound.
    pub upper: f64,
}

impl Default for CurveParamSettings {
    fn default() -> Self {
        Self {
            initial: 0.5,
            lower: 0.0,
            upper: 1.0,
        }
    }
}

/// Knobs for compiling constraints into residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileSettings {
    /// Decimal places used when constants are initialized from geometry.
    pub constant_precision: usize,
    pub curve: CurveParamSettings,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            constant_precision: 2,
            curve: CurveParamSettings::default(),
        }
    }
}

impl CompileSettings {
    pub fn with_constant_precision(mut self, digits: usize) -> Self {
        self.constant_precision = digits;
        self
    }

    pub fn with_curve(mut self, curve: CurveParamSettings) -> Self {
        self.curve = curve;
        self
    }
}
