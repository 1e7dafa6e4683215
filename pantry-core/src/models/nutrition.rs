use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul};

/// The seven tracked nutrients.
///
/// Attached to a [`Food`](super::Food) the values are per 100 g of the
/// food. Returned from aggregation the same shape holds absolute amounts.
/// Sodium is in milligrams, energy in kcal, everything else in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
}

impl NutritionProfile {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
            ..Self::default()
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn with_fiber(mut self, fiber: f64) -> Self {
        self.fiber = fiber;
        self
    }

    pub fn with_sugar(mut self, sugar: f64) -> Self {
        self.sugar = sugar;
        self
    }

    pub fn with_sodium(mut self, sodium: f64) -> Self {
        self.sodium = sodium;
        self
    }

    /// Multiplies every field by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Field values paired with their names, in display order.
    pub fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
            ("fiber", self.fiber),
            ("sugar", self.sugar),
            ("sodium", self.sodium),
        ]
    }

    /// Field-wise comparison with a relative tolerance.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .all(|((_, a), (_, b))| {
                let scale = a.abs().max(b.abs()).max(1.0);
                (a - b).abs() <= tolerance * scale
            })
    }

    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|(_, v)| *v == 0.0)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            calories: f(self.calories),
            protein: f(self.protein),
            carbs: f(self.carbs),
            fat: f(self.fat),
            fiber: f(self.fiber),
            sugar: f(self.sugar),
            sodium: f(self.sodium),
        }
    }
}

impl Add for NutritionProfile {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
            fiber: self.fiber + rhs.fiber,
            sugar: self.sugar + rhs.sugar,
            sodium: self.sodium + rhs.sodium,
        }
    }
}

impl AddAssign for NutritionProfile {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for NutritionProfile {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scaled(rhs)
    }
}

impl Div<f64> for NutritionProfile {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.map(|v| v / rhs)
    }
}

impl std::iter::Sum for NutritionProfile {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

/// Format: "Calories: 254 | Protein: 21g | Carbs: 3g | Fat: 17g | Fiber: 0g | Sugar: 3g | Sodium: 208mg"
impl fmt::Display for NutritionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields()
            .iter()
            .map(|(name, amount)| {
                let unit = match *name {
                    "calories" => "",
                    "sodium" => "mg",
                    _ => "g",
                };
                format!("{}: {:.0}{}", capitalize(name), amount, unit)
            })
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
