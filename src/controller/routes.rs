use regex::Regex;
use url::percent_encoding::percent_decode;

use models::CouponCode;

type ParamsConverter<R> = Fn(Vec<&str>) -> Option<R>;

/// Matches request paths against regexes, first match wins
pub struct RouteParser<R> {
    routes: Vec<(Regex, Box<ParamsConverter<R>>)>,
}

impl<R> Default for RouteParser<R> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<R> RouteParser<R> {
    /// Adds a route without params
    pub fn add_route<F>(&mut self, regex_pattern: &str, f: F) -> &Self
    where
        F: Fn() -> R + 'static,
    {
        self.add_route_with_params(regex_pattern, move |_| Some(f()))
    }

    /// Adds a route with params captured by the regex groups
    pub fn add_route_with_params<F>(&mut self, regex_pattern: &str, f: F) -> &Self
    where
        F: Fn(Vec<&str>) -> Option<R> + 'static,
    {
        match Regex::new(regex_pattern) {
            Ok(regex) => self.routes.push((regex, Box::new(f))),
            Err(e) => error!("Route {} is skipped, invalid regex: {}", regex_pattern, e),
        }
        self
    }

    /// Tests a path against the routes in the order they were added
    pub fn test(&self, route: &str) -> Option<R> {
        self.routes.iter().filter_map(|&(ref regex, ref converter)| {
            regex.captures(route).and_then(|captures| {
                let params = captures.iter().skip(1).filter_map(|capture| capture.map(|m| m.as_str())).collect();
                converter(params)
            })
        }).next()
    }
}

/// List of all routes with params for the app
#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    Healthcheck,
    Coupons,
    CouponsGenerate,
    CouponsClear,
    Coupon(CouponCode),
    Redeem,
    TrackingStatistics,
    TrackingRedemptions,
    TrackingClaims,
    TrackingCoupons,
    TrackingLinks,
    TrackingExport,
}

fn code_param(params: Vec<&str>) -> Option<CouponCode> {
    params
        .get(0)
        .and_then(|param| percent_decode(param.as_bytes()).decode_utf8().ok())
        .map(|code| CouponCode::normalize(&code))
        .filter(|code| !code.is_empty())
}

pub fn create_route_parser() -> RouteParser<Route> {
    let mut router = RouteParser::default();

    // Healthcheck
    router.add_route(r"^/healthcheck$", || Route::Healthcheck);

    // Coupons routes
    router.add_route(r"^/coupons$", || Route::Coupons);
    router.add_route(r"^/coupons/generate$", || Route::CouponsGenerate);
    router.add_route(r"^/coupons/clear$", || Route::CouponsClear);

    // Coupons/:code route
    router.add_route_with_params(r"^/coupons/([^/]+)$", |params| code_param(params).map(Route::Coupon));

    // Redemption form
    router.add_route(r"^/redeem$", || Route::Redeem);

    // Tracking routes
    router.add_route(r"^/tracking/statistics$", || Route::TrackingStatistics);
    router.add_route(r"^/tracking/redemptions$", || Route::TrackingRedemptions);
    router.add_route(r"^/tracking/claims$", || Route::TrackingClaims);
    router.add_route(r"^/tracking/coupons$", || Route::TrackingCoupons);
    router.add_route(r"^/tracking/links$", || Route::TrackingLinks);
    router.add_route(r"^/tracking/export$", || Route::TrackingExport);

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_routes_win_over_code() {
        let router = create_route_parser();
        assert_eq!(router.test("/coupons/generate"), Some(Route::CouponsGenerate));
        assert_eq!(router.test("/coupons/clear"), Some(Route::CouponsClear));
        assert_eq!(router.test("/healthcheck"), Some(Route::Healthcheck));
    }

    #[test]
    fn test_code_is_decoded_and_normalized() {
        let router = create_route_parser();
        assert_eq!(
            router.test("/coupons/ab%23c%26d%3F%25"),
            Some(Route::Coupon(CouponCode("AB#C&D?%".to_string())))
        );
    }

    #[test]
    fn test_unknown_route() {
        let router = create_route_parser();
        assert_eq!(router.test("/coupons/a/b"), None);
        assert_eq!(router.test("/admin"), None);
    }
}
