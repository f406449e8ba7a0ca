// Test selection from assumption outcomes
//
// Decision table, evaluated in priority order:
//
// | homoscedasticity | normality | route            |
// |------------------|-----------|------------------|
// | fails            | any       | WelchAnova       |
// | holds            | fails     | KruskalWallis    |
// | holds            | holds     | ParametricAnova  |
//
// Equal cell sizes never changes the route; a failure is only reported.

use serde::{Deserialize, Serialize};

/// Assumption booleans gathered before test selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssumptionOutcomes {
    pub equal_sizes: bool,
    pub normality: bool,
    pub homoscedasticity: bool,
    /// Shape similarity is left to manual inspection of the distribution plot
    pub shape_checked_manually: bool,
}

impl AssumptionOutcomes {
    /// All three gating assumptions hold
    pub fn all_passed(&self) -> bool {
        self.equal_sizes && self.normality && self.homoscedasticity
    }

    /// Names of the gating assumptions that failed
    pub fn failed(&self) -> Vec<&'static str> {
        [
            (self.equal_sizes, "equal cell sizes"),
            (self.normality, "normality"),
            (self.homoscedasticity, "homoscedasticity"),
        ]
        .into_iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Omnibus and post-hoc family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// One-way ANOVA, Tukey HSD, eta-squared
    ParametricAnova,
    /// Welch's ANOVA, Games-Howell, eta-squared
    WelchAnova,
    /// Kruskal-Wallis, Dunn's test, epsilon-squared
    KruskalWallis,
}

impl Route {
    pub fn omnibus_name(&self) -> &'static str {
        match self {
            Self::ParametricAnova => "ANOVA",
            Self::WelchAnova => "Welch's ANOVA",
            Self::KruskalWallis => "Kruskal-Wallis",
        }
    }

    pub fn posthoc_name(&self) -> &'static str {
        match self {
            Self::ParametricAnova => "Tukey HSD",
            Self::WelchAnova => "Games-Howell",
            Self::KruskalWallis => "Dunn's test",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.omnibus_name())
    }
}

/// Pick the test family for a set of assumption outcomes
///
/// # Example
/// ```
/// use goggles::analysis::{select_route, AssumptionOutcomes, Route};
///
/// let outcomes = AssumptionOutcomes {
///     equal_sizes: false,
///     normality: true,
///     homoscedasticity: true,
///     shape_checked_manually: true,
/// };
/// assert_eq!(select_route(&outcomes), Route::ParametricAnova);
/// ```
pub fn select_route(outcomes: &AssumptionOutcomes) -> Route {
    if !outcomes.homoscedasticity {
        Route::WelchAnova
    } else if !outcomes.normality {
        Route::KruskalWallis
    } else {
        Route::ParametricAnova
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(equal_sizes: bool, normality: bool, homoscedasticity: bool) -> AssumptionOutcomes {
        AssumptionOutcomes {
            equal_sizes,
            normality,
            homoscedasticity,
            shape_checked_manually: true,
        }
    }

    #[test]
    fn test_full_decision_table() {
        for equal_sizes in [true, false] {
            for normality in [true, false] {
                for homoscedasticity in [true, false] {
                    let route = select_route(&outcomes(equal_sizes, normality, homoscedasticity));
                    let expected = match (normality, homoscedasticity) {
                        (_, false) => Route::WelchAnova,
                        (false, true) => Route::KruskalWallis,
                        (true, true) => Route::ParametricAnova,
                    };
                    assert_eq!(route, expected, "{} {} {}", equal_sizes, normality, homoscedasticity);
                }
            }
        }
    }

    #[test]
    fn test_sizes_and_normality_failing_routes_kruskal() {
        assert_eq!(select_route(&outcomes(false, false, true)), Route::KruskalWallis);
    }

    #[test]
    fn test_failed_lists_names() {
        let o = outcomes(false, true, false);
        assert!(!o.all_passed());
        assert_eq!(o.failed(), vec!["equal cell sizes", "homoscedasticity"]);
        assert!(outcomes(true, true, true).failed().is_empty());
    }
}
