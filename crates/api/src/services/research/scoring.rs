//! Pure scoring and aggregation for research results.
//!
//! Nothing here touches the database. Every average is zero-safe so an
//! empty candidate set yields zeros, never `NaN`.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use nellore_market_core::Money;

use crate::models::{ProductListing, ServiceListing, SiblingItem};

/// Items per recommendation bucket.
pub const BUCKET_SIZE: usize = 3;

/// Minimum rating for the `top_rated` bucket.
pub const TOP_RATED_MIN: f64 = 4.5;

/// Minimum discount percentage for the `best_deals` bucket.
pub const DEAL_MIN_DISCOUNT: f64 = 10.0;

/// The numbers every catalog listing exposes to scoring.
pub trait Scorable {
    /// JSON key for a list of these items.
    const COLLECTION: &'static str;

    fn rating(&self) -> f64;
    fn price(&self) -> Money;
    fn review_count(&self) -> i64;
    fn vendor_verified(&self) -> bool;
}

impl Scorable for ServiceListing {
    const COLLECTION: &'static str = "services";

    fn rating(&self) -> f64 {
        self.service.rating
    }

    fn price(&self) -> Money {
        self.service.price
    }

    fn review_count(&self) -> i64 {
        self.service.review_count
    }

    fn vendor_verified(&self) -> bool {
        self.vendor_verified
    }
}

impl Scorable for ProductListing {
    const COLLECTION: &'static str = "products";

    fn rating(&self) -> f64 {
        self.product.rating
    }

    fn price(&self) -> Money {
        self.product.price
    }

    fn review_count(&self) -> i64 {
        self.product.review_count
    }

    fn vendor_verified(&self) -> bool {
        self.vendor_verified
    }
}

#[allow(clippy::cast_precision_loss)]
const fn count_f64(n: i64) -> f64 {
    n as f64
}

const fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// `0.4·rating + 0.3·vendor_rating + 0.01·reviews + 10·verified`
#[must_use]
pub fn service_relevance(s: &ServiceListing) -> f64 {
    0.4f64.mul_add(
        s.rating(),
        0.3f64.mul_add(
            s.vendor_rating,
            0.01f64.mul_add(count_f64(s.review_count()), 10.0 * flag(s.vendor_verified())),
        ),
    )
}

/// `0.4·rating + 0.01·reviews + 10·verified + 5·featured`
#[must_use]
pub fn product_relevance(p: &ProductListing) -> f64 {
    0.4f64.mul_add(
        p.rating(),
        0.01f64.mul_add(
            count_f64(p.review_count()),
            10.0f64.mul_add(flag(p.vendor_verified()), 5.0 * flag(p.product.is_featured)),
        ),
    )
}

/// Overall score used to pick a winner when comparing services.
///
/// The inverse-price term is zero for a free service.
#[must_use]
pub fn service_comparison_score(s: &ServiceListing) -> f64 {
    let price = s.price().as_f64();
    let inverse_price = if price > 0.0 { 100.0 / price } else { 0.0 };
    0.4f64.mul_add(
        s.rating(),
        20.0f64.mul_add(
            flag(s.vendor_verified()),
            0.1f64.mul_add(count_f64(s.review_count()), inverse_price),
        ),
    )
}

/// Overall score used to pick a winner when comparing products.
#[must_use]
pub fn product_comparison_score(p: &ProductListing) -> f64 {
    0.3f64.mul_add(
        p.rating(),
        0.2f64.mul_add(
            p.discount_percent,
            20.0f64.mul_add(flag(p.vendor_verified()), 0.1 * count_f64(p.review_count())),
        ),
    )
}

/// Rating per rupee. A free item with any rating beats every priced one.
#[must_use]
pub fn value_ratio<T: Scorable>(item: &T) -> f64 {
    let price = item.price().as_f64();
    if price > 0.0 {
        item.rating() / price
    } else if item.rating() > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Sorts by `score` descending, keeping store order among equal scores.
#[must_use]
pub fn rank_by<T>(items: Vec<T>, score: impl Fn(&T) -> f64) -> Vec<T> {
    let mut scored: Vec<(f64, T)> = items.into_iter().map(|item| (score(&item), item)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, item)| item).collect()
}

/// The first item with the highest score.
#[must_use]
pub fn best_by<T>(items: &[T], score: impl Fn(&T) -> f64) -> Option<&T> {
    let mut best: Option<(f64, &T)> = None;
    for item in items {
        let s = score(item);
        if best.is_none_or(|(top, _)| s > top) {
            best = Some((s, item));
        }
    }
    best.map(|(_, item)| item)
}

/// A named subset of research results.
///
/// Serializes as `{"type", "title", "services" | "products"}`.
#[derive(Debug, Clone)]
pub struct Bucket<T> {
    pub kind: &'static str,
    pub title: &'static str,
    pub items: Vec<T>,
}

impl<T: Scorable + Serialize> Serialize for Bucket<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Bucket", 3)?;
        state.serialize_field("type", self.kind)?;
        state.serialize_field("title", self.title)?;
        state.serialize_field(T::COLLECTION, &self.items)?;
        state.end()
    }
}

/// The first few ranked items rated at least [`TOP_RATED_MIN`].
#[must_use]
pub fn top_rated<T: Scorable + Clone>(ranked: &[T]) -> Vec<T> {
    ranked
        .iter()
        .filter(|item| item.rating() >= TOP_RATED_MIN)
        .take(BUCKET_SIZE)
        .cloned()
        .collect()
}

#[must_use]
pub fn best_value<T: Scorable + Clone>(ranked: &[T]) -> Vec<T> {
    rank_by(ranked.to_vec(), value_ratio)
        .into_iter()
        .take(BUCKET_SIZE)
        .collect()
}

#[must_use]
pub fn most_reviewed<T: Scorable + Clone>(ranked: &[T]) -> Vec<T> {
    rank_by(ranked.to_vec(), |item| count_f64(item.review_count()))
        .into_iter()
        .take(BUCKET_SIZE)
        .collect()
}

/// Products discounted by more than [`DEAL_MIN_DISCOUNT`] percent, deepest first.
#[must_use]
pub fn best_deals(ranked: &[ProductListing]) -> Vec<ProductListing> {
    let deals = ranked
        .iter()
        .filter(|p| p.discount_percent > DEAL_MIN_DISCOUNT)
        .cloned()
        .collect();
    rank_by(deals, |p| p.discount_percent)
        .into_iter()
        .take(BUCKET_SIZE)
        .collect()
}

/// Arithmetic mean, zero for no values.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / f64::from(n) }
}

/// Mean amount rounded to the nearest paisa, zero for no amounts.
#[must_use]
pub fn mean_money(amounts: impl IntoIterator<Item = Money>) -> Money {
    let (sum, n) = amounts
        .into_iter()
        .fold((0_i64, 0_i64), |(sum, n), m| (sum + m.paise(), n + 1));
    if n == 0 {
        Money::ZERO
    } else {
        Money::from_paise((sum + n / 2).div_euclid(n))
    }
}

/// Lowest, highest and mean price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSpread {
    pub lowest: Money,
    pub highest: Money,
    pub average: Money,
}

impl PriceSpread {
    #[must_use]
    pub fn of<T: Scorable>(items: &[T]) -> Self {
        Self {
            lowest: items.iter().map(Scorable::price).min().unwrap_or(Money::ZERO),
            highest: items.iter().map(Scorable::price).max().unwrap_or(Money::ZERO),
            average: mean_money(items.iter().map(Scorable::price)),
        }
    }
}

/// Best, lowest and mean rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSpread {
    pub best: f64,
    pub lowest: f64,
    pub average: f64,
}

impl RatingSpread {
    #[must_use]
    pub fn of<T: Scorable>(items: &[T]) -> Self {
        if items.is_empty() {
            return Self {
                best: 0.0,
                lowest: 0.0,
                average: 0.0,
            };
        }
        Self {
            best: items.iter().map(Scorable::rating).fold(f64::MIN, f64::max),
            lowest: items.iter().map(Scorable::rating).fold(f64::MAX, f64::min),
            average: mean(items.iter().map(Scorable::rating)),
        }
    }
}

/// Count of reviews per star value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingDistribution {
    #[serde(rename = "5")]
    pub five: usize,
    #[serde(rename = "4")]
    pub four: usize,
    #[serde(rename = "3")]
    pub three: usize,
    #[serde(rename = "2")]
    pub two: usize,
    #[serde(rename = "1")]
    pub one: usize,
}

impl RatingDistribution {
    #[must_use]
    pub fn of(ratings: &[i64]) -> Self {
        let mut dist = Self::default();
        for rating in ratings {
            match rating {
                5 => dist.five += 1,
                4 => dist.four += 1,
                3 => dist.three += 1,
                2 => dist.two += 1,
                1 => dist.one += 1,
                _ => {}
            }
        }
        dist
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Sentiment {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl Sentiment {
    /// Four stars and up are positive, three neutral, two and below negative.
    #[must_use]
    pub fn of(ratings: &[i64]) -> Self {
        Self {
            positive: ratings.iter().filter(|r| **r >= 4).count(),
            neutral: ratings.iter().filter(|r| **r == 3).count(),
            negative: ratings.iter().filter(|r| **r <= 2).count(),
        }
    }
}

/// 1-based rank from the cheapest among the item and its siblings.
#[must_use]
pub fn price_position(price: Money, siblings: &[SiblingItem]) -> usize {
    siblings.iter().filter(|s| s.price < price).count() + 1
}

/// 1-based rank from the best rated among the item and its siblings.
#[must_use]
pub fn rating_position(rating: f64, siblings: &[SiblingItem]) -> usize {
    siblings.iter().filter(|s| s.rating > rating).count() + 1
}
