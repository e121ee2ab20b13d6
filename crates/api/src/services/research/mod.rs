//! Deep research over the catalog: scored search, side-by-side comparison,
//! trending recommendations and per-item analytics.
//!
//! The repository narrows candidates; [`scoring`] ranks them.

pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::instrument;

use nellore_market_core::{ItemType, Money, ProductId, ReviewType, ServiceId, UserId};

use crate::db::research::ProductBounds;
use crate::db::{CatalogRepository, ResearchRepository, ReviewRepository};
use crate::models::{ProductListing, PurchaseCount, ServiceListing, SiblingItem};
use crate::services::ServiceError;

use scoring::{
    Bucket, PriceSpread, RatingDistribution, RatingSpread, Scorable, Sentiment, best_by,
    best_deals, best_value, mean, mean_money, most_reviewed, product_comparison_score,
    product_relevance, rank_by, service_comparison_score, service_relevance, top_rated,
};

const SERVICE_RESULTS: usize = 10;
const PRODUCT_RESULTS: usize = 20;
const COMPARE_MIN: usize = 2;
const COMPARE_MAX: usize = 5;
const TRENDING_PER_KIND: i64 = 5;
const PURCHASE_HISTORY: i64 = 50;
const TOP_PURCHASES: usize = 3;
const ANALYTICS_REVIEWS: i64 = 100;
const RELATED_ITEMS: usize = 5;

// ---- requests ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceQuery {
    pub query: Option<String>,
    pub budget: Option<Money>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub query: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub min_rating: Option<f64>,
}

/// Which kinds of trending items to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationScope {
    #[default]
    All,
    Services,
    Products,
}

impl RecommendationScope {
    const fn includes(self, kind: ItemType) -> bool {
        matches!(
            (self, kind),
            (Self::All, _) | (Self::Services, ItemType::Service) | (Self::Products, ItemType::Product)
        )
    }
}

// ---- responses ----

#[derive(Debug, Clone, Serialize)]
pub struct Scored<T> {
    #[serde(flatten)]
    pub item: T,
    pub relevance_score: f64,
}

impl<T: Scorable> Scorable for Scored<T> {
    const COLLECTION: &'static str = T::COLLECTION;

    fn rating(&self) -> f64 {
        self.item.rating()
    }

    fn price(&self) -> Money {
        self.item.price()
    }

    fn review_count(&self) -> i64 {
        self.item.review_count()
    }

    fn vendor_verified(&self) -> bool {
        self.item.vendor_verified()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata<F> {
    pub timestamp: DateTime<Utc>,
    pub filters_applied: F,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceFilters {
    pub budget: Option<Money>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProductFilters {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInsights {
    pub total_found: usize,
    pub avg_price: Money,
    pub avg_rating: f64,
    pub verified_vendors: usize,
    pub recommendations: Vec<Bucket<Scored<ServiceListing>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceResearch {
    pub query: String,
    pub services: Vec<Scored<ServiceListing>>,
    pub insights: ServiceInsights,
    pub search_metadata: SearchMetadata<ServiceFilters>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
    pub avg: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductInsights {
    pub total_found: usize,
    pub price_range: PriceRange,
    pub avg_rating: f64,
    pub avg_discount: f64,
    pub verified_sellers: usize,
    pub recommendations: Vec<Bucket<Scored<ProductListing>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResearch {
    pub query: String,
    pub products: Vec<Scored<ProductListing>>,
    pub insights: ProductInsights,
    pub search_metadata: SearchMetadata<ProductFilters>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonInsights {
    pub price_comparison: PriceSpread,
    pub rating_comparison: RatingSpread,
    pub verified_vendors: usize,
    pub total_reviews: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServicePick {
    pub service_id: ServiceId,
    pub service_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceComparison {
    pub services: Vec<ServiceListing>,
    pub insights: ComparisonInsights,
    pub recommendation: ServicePick,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiscountSpread {
    pub best: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductComparisonInsights {
    pub price_comparison: PriceSpread,
    pub rating_comparison: RatingSpread,
    pub discount_comparison: DiscountSpread,
    pub verified_sellers: usize,
    pub total_reviews: i64,
    pub in_stock: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPick {
    pub product_id: ProductId,
    pub product_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductComparison {
    pub products: Vec<ProductListing>,
    pub insights: ProductComparisonInsights,
    pub recommendation: ProductPick,
}

/// A trending catalog entry, tagged with its kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrendingItem {
    Service(ServiceListing),
    Product(ProductListing),
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInsights {
    /// Distinct items the user has ordered.
    pub purchased_items: usize,
    pub most_purchased: Vec<PurchaseCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub trending: Vec<TrendingItem>,
    pub user_insights: UserInsights,
}

/// The analysed item, either kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyticsItem {
    Service(ServiceListing),
    Product(ProductListing),
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
    pub rating_distribution: RatingDistribution,
    pub avg_rating: f64,
    pub total_reviews: usize,
    pub verified_vendor: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitiveAnalysis {
    /// `None` when the category has no other active items.
    pub price_position: Option<usize>,
    pub rating_position: Option<usize>,
    pub related_items: Vec<SiblingItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalytics {
    pub item: AnalyticsItem,
    pub performance: Performance,
    pub competitive_analysis: CompetitiveAnalysis,
    pub sentiment_summary: Sentiment,
}

// ---- service ----

/// Research service.
pub struct ResearchService<'a> {
    pool: &'a SqlitePool,
    research: ResearchRepository<'a>,
}

impl<'a> ResearchService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            research: ResearchRepository::new(pool),
        }
    }

    /// Score matching services and group the best of them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the query is blank.
    #[instrument(skip(self, request), fields(query = ?request.query))]
    pub async fn research_services(
        &self,
        request: ServiceQuery,
    ) -> Result<ServiceResearch, ServiceError> {
        let query = required_query(request.query.as_deref())?;
        let candidates = self
            .research
            .service_candidates(&query, request.budget)
            .await?;

        let services: Vec<Scored<ServiceListing>> = rank_by(candidates, service_relevance)
            .into_iter()
            .take(SERVICE_RESULTS)
            .map(|item| Scored {
                relevance_score: service_relevance(&item),
                item,
            })
            .collect();

        let recommendations = if services.is_empty() {
            Vec::new()
        } else {
            vec![
                Bucket {
                    kind: "top_rated",
                    title: "Highest Rated",
                    items: top_rated(&services),
                },
                Bucket {
                    kind: "best_value",
                    title: "Best Value for Money",
                    items: best_value(&services),
                },
                Bucket {
                    kind: "most_trusted",
                    title: "Most Reviewed",
                    items: most_reviewed(&services),
                },
            ]
        };

        let insights = ServiceInsights {
            total_found: services.len(),
            avg_price: mean_money(services.iter().map(Scorable::price)),
            avg_rating: mean(services.iter().map(Scorable::rating)),
            verified_vendors: services.iter().filter(|s| s.vendor_verified()).count(),
            recommendations,
        };

        Ok(ServiceResearch {
            query,
            services,
            insights,
            search_metadata: SearchMetadata {
                timestamp: Utc::now(),
                filters_applied: ServiceFilters {
                    budget: request.budget,
                    location: request.location,
                },
            },
        })
    }

    /// Score matching products and group the best of them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the query is blank.
    #[instrument(skip(self, request), fields(query = ?request.query))]
    pub async fn research_products(
        &self,
        request: ProductQuery,
    ) -> Result<ProductResearch, ServiceError> {
        let query = required_query(request.query.as_deref())?;
        let bounds = ProductBounds {
            min_price: request.min_price,
            max_price: request.max_price,
            min_rating: request.min_rating,
        };
        let candidates = self.research.product_candidates(&query, bounds).await?;

        let ranked: Vec<ProductListing> = rank_by(candidates, product_relevance)
            .into_iter()
            .take(PRODUCT_RESULTS)
            .collect();
        let deals = best_deals(&ranked);
        let products: Vec<Scored<ProductListing>> = ranked
            .into_iter()
            .map(|item| Scored {
                relevance_score: product_relevance(&item),
                item,
            })
            .collect();

        let recommendations = if products.is_empty() {
            Vec::new()
        } else {
            let score = |item: ProductListing| Scored {
                relevance_score: product_relevance(&item),
                item,
            };
            vec![
                Bucket {
                    kind: "top_rated",
                    title: "Highest Rated Products",
                    items: top_rated(&products),
                },
                Bucket {
                    kind: "best_value",
                    title: "Best Value for Money",
                    items: best_value(&products),
                },
                Bucket {
                    kind: "most_trusted",
                    title: "Most Popular",
                    items: most_reviewed(&products),
                },
                Bucket {
                    kind: "best_deals",
                    title: "Best Deals & Discounts",
                    items: deals.into_iter().map(score).collect(),
                },
            ]
        };

        let spread = PriceSpread::of(&products);
        let insights = ProductInsights {
            total_found: products.len(),
            price_range: PriceRange {
                min: spread.lowest,
                max: spread.highest,
                avg: spread.average,
            },
            avg_rating: mean(products.iter().map(Scorable::rating)),
            avg_discount: mean(products.iter().map(|p| p.item.discount_percent)),
            verified_sellers: products.iter().filter(|p| p.vendor_verified()).count(),
            recommendations,
        };

        Ok(ProductResearch {
            query,
            products,
            insights,
            search_metadata: SearchMetadata {
                timestamp: Utc::now(),
                filters_applied: ProductFilters {
                    min_price: request.min_price,
                    max_price: request.max_price,
                    min_rating: request.min_rating,
                },
            },
        })
    }

    /// Compare two to five services and pick the best overall.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the id list is missing, the
    /// wrong size or holds a non-numeric id.
    /// Returns `ServiceError::NotFound` if fewer than two are active.
    pub async fn compare_services(
        &self,
        ids: Option<&Value>,
    ) -> Result<ServiceComparison, ServiceError> {
        let ids: Vec<ServiceId> = parse_compare_ids(ids, ItemType::Service)?
            .into_iter()
            .map(ServiceId::new)
            .collect();
        let services = self.research.services_by_ids(&ids).await?;
        if services.len() < COMPARE_MIN {
            return Err(ServiceError::not_found("Not enough services found for comparison"));
        }

        let best = best_by(&services, service_comparison_score)
            .ok_or_else(|| ServiceError::not_found("Not enough services found for comparison"))?;
        let recommendation = ServicePick {
            service_id: best.service.id,
            service_name: best.service.name.clone(),
            reason: format!(
                "Best overall choice based on rating ({}★), price ({}), and {} reviews",
                best.service.rating, best.service.price, best.service.review_count
            ),
        };

        let insights = ComparisonInsights {
            price_comparison: PriceSpread::of(&services),
            rating_comparison: RatingSpread::of(&services),
            verified_vendors: services.iter().filter(|s| s.vendor_verified).count(),
            total_reviews: services.iter().map(|s| s.service.review_count).sum(),
        };

        Ok(ServiceComparison {
            services,
            insights,
            recommendation,
        })
    }

    /// Compare two to five products and pick the best value.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the id list is missing, the
    /// wrong size or holds a non-numeric id.
    /// Returns `ServiceError::NotFound` if fewer than two are active.
    pub async fn compare_products(
        &self,
        ids: Option<&Value>,
    ) -> Result<ProductComparison, ServiceError> {
        let ids: Vec<ProductId> = parse_compare_ids(ids, ItemType::Product)?
            .into_iter()
            .map(ProductId::new)
            .collect();
        let products = self.research.products_by_ids(&ids).await?;
        if products.len() < COMPARE_MIN {
            return Err(ServiceError::not_found("Not enough products found for comparison"));
        }

        let best = best_by(&products, product_comparison_score)
            .ok_or_else(|| ServiceError::not_found("Not enough products found for comparison"))?;
        let recommendation = ProductPick {
            product_id: best.product.id,
            product_name: best.product.name.clone(),
            reason: format!(
                "Best value with {}★ rating, {}% discount, and {} reviews",
                best.product.rating, best.discount_percent, best.product.review_count
            ),
        };

        let insights = ProductComparisonInsights {
            price_comparison: PriceSpread::of(&products),
            rating_comparison: RatingSpread::of(&products),
            discount_comparison: DiscountSpread {
                best: products
                    .iter()
                    .map(|p| p.discount_percent)
                    .fold(0.0, f64::max),
                average: mean(products.iter().map(|p| p.discount_percent)),
            },
            verified_sellers: products.iter().filter(|p| p.vendor_verified).count(),
            total_reviews: products.iter().map(|p| p.product.review_count).sum(),
            in_stock: products.iter().filter(|p| p.product.stock > 0).count(),
        };

        Ok(ProductComparison {
            products,
            insights,
            recommendation,
        })
    }

    /// Trending items plus a summary of what `user_id` has bought.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the database operation fails.
    pub async fn recommendations(
        &self,
        user_id: UserId,
        scope: RecommendationScope,
    ) -> Result<Recommendations, ServiceError> {
        let history = self
            .research
            .purchase_history(user_id, PURCHASE_HISTORY)
            .await?;

        let mut trending = Vec::new();
        if scope.includes(ItemType::Service) {
            let services = self.research.trending_services(TRENDING_PER_KIND).await?;
            trending.extend(services.into_iter().map(TrendingItem::Service));
        }
        if scope.includes(ItemType::Product) {
            let products = self.research.trending_products(TRENDING_PER_KIND).await?;
            trending.extend(products.into_iter().map(TrendingItem::Product));
        }

        Ok(Recommendations {
            trending,
            user_insights: UserInsights {
                purchased_items: history.len(),
                most_purchased: history.into_iter().take(TOP_PURCHASES).collect(),
            },
        })
    }

    /// Review breakdown and category standing for one active item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `kind` is not `service` or `product`.
    /// Returns `ServiceError::NotFound` if the item is missing or inactive.
    pub async fn analytics(&self, kind: &str, id: i64) -> Result<ItemAnalytics, ServiceError> {
        let kind: ItemType = kind
            .parse()
            .map_err(|_| ServiceError::validation("Type must be either \"service\" or \"product\""))?;
        let catalog = CatalogRepository::new(self.pool);

        let (item, review_type) = match kind {
            ItemType::Service => {
                let service = catalog
                    .get_service_listing(ServiceId::new(id))
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Service not found"))?;
                (AnalyticsItem::Service(service), ReviewType::Service)
            }
            ItemType::Product => {
                let product = catalog
                    .get_product_listing(ProductId::new(id))
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Product not found"))?;
                (AnalyticsItem::Product(product), ReviewType::Product)
            }
        };
        let (category_id, price, rating, verified) = match &item {
            AnalyticsItem::Service(s) => (
                s.service.category_id,
                s.service.price,
                s.service.rating,
                s.vendor_verified,
            ),
            AnalyticsItem::Product(p) => (
                p.product.category_id,
                p.product.price,
                p.product.rating,
                p.vendor_verified,
            ),
        };

        let ratings = ReviewRepository::new(self.pool)
            .recent_ratings(review_type, id, ANALYTICS_REVIEWS)
            .await?;
        let siblings = self.research.siblings(kind, category_id, id).await?;

        let (price_position, rating_position) = if siblings.is_empty() {
            (None, None)
        } else {
            (
                Some(scoring::price_position(price, &siblings)),
                Some(scoring::rating_position(rating, &siblings)),
            )
        };

        Ok(ItemAnalytics {
            item,
            performance: Performance {
                rating_distribution: RatingDistribution::of(&ratings),
                avg_rating: rating,
                total_reviews: ratings.len(),
                verified_vendor: verified,
            },
            competitive_analysis: CompetitiveAnalysis {
                price_position,
                rating_position,
                related_items: siblings.into_iter().take(RELATED_ITEMS).collect(),
            },
            sentiment_summary: Sentiment::of(&ratings),
        })
    }
}

fn required_query(query: Option<&str>) -> Result<String, ServiceError> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ServiceError::validation("Search query is required"))
}

/// Reads a comparison id list given as JSON numbers or numeric strings.
fn parse_compare_ids(raw: Option<&Value>, kind: ItemType) -> Result<Vec<i64>, ServiceError> {
    let ids = match raw {
        Some(Value::Array(ids)) if ids.len() >= COMPARE_MIN => ids,
        _ => {
            return Err(ServiceError::Validation(format!(
                "At least {COMPARE_MIN} {kind} IDs required for comparison"
            )));
        }
    };
    if ids.len() > COMPARE_MAX {
        return Err(ServiceError::Validation(format!(
            "Maximum {COMPARE_MAX} {kind}s can be compared at once"
        )));
    }

    ids.iter()
        .map(|id| match id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect::<Option<Vec<i64>>>()
        .ok_or_else(|| ServiceError::Validation(format!("All {kind} IDs must be valid numbers")))
}
