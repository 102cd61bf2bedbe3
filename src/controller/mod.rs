//! `Controller` is a top layer that handles all http-related
//! stuff like reading bodies, parsing params, forming a response.
//! Basically it provides inputs to `Service` layer and converts outputs
//! of `Service` layer to http responses

pub mod context;
pub mod routes;
pub mod types;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;

use failure::Error as FailureError;
use futures::future;
use futures::{Future, IntoFuture};
use hyper;
use hyper::header::ContentType;
use hyper::server::{Request, Response, Service as HyperService};
use hyper::Method::{Delete, Get, Post};
use hyper::StatusCode;
use sentry::integrations::failure::capture_error;

use self::context::StaticContext;
use self::routes::{Route, RouteParser};
use self::types::ControllerFuture;
use self::utils::{parse_body, parse_query, query_param, response_with_csv, response_with_error, response_with_json};
use errors::{kind_of, Codeable, Error};
use models::*;
use repos::ReposFactory;
use services::*;

/// Recent redemptions shown when no limit is asked for
pub const DEFAULT_REDEMPTIONS_LIMIT: usize = 10;

macro_rules! serialize_future {
    ($e:expr) => {
        Box::new($e.and_then(|resp| response_with_json(&resp)))
    };
}

pub trait Controller {
    fn call(&self, req: Request) -> ControllerFuture;
}

/// Controller handles route parsing and calling `Service` layer
pub struct ControllerImpl<F: ReposFactory> {
    pub static_context: StaticContext<F>,
    pub route_parser: Arc<RouteParser<Route>>,
}

impl<F: ReposFactory> ControllerImpl<F> {
    /// Create a new controller based on services
    pub fn new(static_context: StaticContext<F>) -> Self {
        let route_parser = Arc::new(routes::create_route_parser());
        Self {
            static_context,
            route_parser,
        }
    }
}

/// `status=all` and an empty status both list every live coupon
fn coupons_search(params: &HashMap<String, String>) -> Result<CouponsSearch, FailureError> {
    let status = match params.get("status").map(|status| status.trim().to_lowercase()) {
        Some(ref status) if status == "all" => None,
        _ => query_param::<CouponStatus>(params, "status")?,
    };
    Ok(CouponsSearch {
        status,
        term: params
            .get("search")
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty()),
    })
}

impl<F: ReposFactory> Controller for ControllerImpl<F> {
    /// Handle a request and get future response
    fn call(&self, req: Request) -> ControllerFuture {
        let service = Service::new(self.static_context.clone());
        let params = parse_query(req.query());
        let content_type = req.headers().get::<ContentType>().cloned();

        let path = req.path().to_string();
        match (req.method().clone(), self.route_parser.test(req.path())) {
            // GET /healthcheck
            (Get, Some(Route::Healthcheck)) => serialize_future!(service.healthcheck()),

            // GET /coupons
            (Get, Some(Route::Coupons)) => serialize_future!(
                coupons_search(&params)
                    .into_future()
                    .and_then(move |search| service.list_coupons(search))
            ),

            // POST /coupons/generate
            (Post, Some(Route::CouponsGenerate)) => serialize_future!(
                parse_body::<NewCouponBatch>(req.body(), content_type).and_then(move |batch| service.generate_coupons(batch))
            ),

            // POST /coupons/clear
            (Post, Some(Route::CouponsClear)) => serialize_future!(service.clear_coupons()),

            // GET /coupons/<code>
            (Get, Some(Route::Coupon(code))) => serialize_future!(service.get_coupon(code)),

            // DELETE /coupons/<code>
            (Delete, Some(Route::Coupon(code))) => serialize_future!(service.delete_coupon(code)),

            // GET /redeem?code=
            (Get, Some(Route::Redeem)) => {
                let code = params.get("code").cloned().unwrap_or_default();
                serialize_future!(service.preview(CouponCode::normalize(&code)))
            }

            // POST /redeem
            (Post, Some(Route::Redeem)) => serialize_future!(
                parse_body::<RedemptionForm>(req.body(), content_type).and_then(move |form| service.redeem(form))
            ),

            // GET /tracking/statistics
            (Get, Some(Route::TrackingStatistics)) => serialize_future!(service.statistics()),

            // GET /tracking/redemptions?limit=
            (Get, Some(Route::TrackingRedemptions)) => serialize_future!(
                query_param::<usize>(&params, "limit")
                    .into_future()
                    .and_then(move |limit| service.recent_redemptions(limit.unwrap_or(DEFAULT_REDEMPTIONS_LIMIT)))
            ),

            // GET /tracking/claims
            (Get, Some(Route::TrackingClaims)) => serialize_future!(service.claims()),

            // GET /tracking/coupons
            (Get, Some(Route::TrackingCoupons)) => serialize_future!(
                coupons_search(&params)
                    .into_future()
                    .and_then(move |search| service.tracked_coupons(search))
            ),

            // GET /tracking/links
            (Get, Some(Route::TrackingLinks)) => serialize_future!(service.form_links()),

            // GET /tracking/export
            (Get, Some(Route::TrackingExport)) => Box::new(
                service
                    .export_csv()
                    .map(|csv| response_with_csv(csv, "coupon-tracking.csv")),
            ),

            // Fallback
            (method, _) => Box::new(future::err(
                format_err!("Request to non existing endpoint in coupons microservice! {:?} {:?}", method, path)
                    .context(Error::NotFound)
                    .into(),
            )),
        }
    }
}

/// Status and message a failed request is answered with.
/// Errors without a known kind are internal and reported to sentry.
pub fn error_response(err: &FailureError) -> Response {
    match kind_of(err) {
        Some(kind) => {
            let status = kind.code();
            if status == StatusCode::InternalServerError || status == StatusCode::ServiceUnavailable {
                error!("{}", err);
                capture_error(err);
            } else {
                warn!("{}", err);
            }
            response_with_error(status, kind.message())
        }
        None => {
            error!("{}", err);
            capture_error(err);
            response_with_error(StatusCode::InternalServerError, "Internal server error".to_string())
        }
    }
}

/// Hyper service answering every request through a `Controller`
pub struct Application<C: Controller> {
    pub controller: C,
}

impl<C: Controller> Application<C> {
    pub fn new(controller: C) -> Self {
        Self { controller }
    }
}

impl<C: Controller> HyperService for Application<C> {
    type Request = Request;
    type Response = Response;
    type Error = hyper::Error;
    type Future = Box<Future<Item = Response, Error = hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        debug!("Received request {} {}", req.method(), req.path());

        Box::new(
            self.controller
                .call(req)
                .or_else(|err| future::ok::<_, hyper::Error>(error_response(&err))),
        )
    }
}

#[cfg(test)]
mod tests {
    use futures::Stream;
    use hyper::Uri;
    use std::str::FromStr;
    use tokio_core::reactor::Core;

    use super::*;
    use services::tests::*;

    fn create_controller(core: &mut Core, rows: Vec<::serde_json::Value>) -> ControllerImpl<::repos::ReposFactoryImpl> {
        let ledger = create_ledger(core, rows);
        let service = create_service_with_ledger(Arc::new(ledger));
        ControllerImpl::new(service.static_context)
    }

    fn request(method: hyper::Method, uri: &str, body: &str, content_type: ContentType) -> Request {
        let mut req = Request::new(method, Uri::from_str(uri).unwrap());
        req.headers_mut().set(content_type);
        req.set_body(body.to_string());
        req
    }

    fn answer(core: &mut Core, app: &Application<ControllerImpl<::repos::ReposFactoryImpl>>, req: Request) -> (StatusCode, String) {
        let response = core.run(app.call(req)).unwrap();
        let status = response.status();
        let body = core.run(response.body().concat2()).unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_redeem_with_urlencoded_form() {
        let mut core = Core::new().unwrap();
        let controller = create_controller(&mut core, vec![coupon_row("WXWXWXWX", "unused", 100, "", "")]);
        let app = Application::new(controller);
        let form = ContentType("application/x-www-form-urlencoded".parse().unwrap());

        let (status, body) = answer(
            &mut core,
            &app,
            request(Post, "/redeem", "couponCode=wxwxwxwx&name=Asha&phone=9876543210&email=a%40b.com", form),
        );
        assert_eq!(status, StatusCode::Ok);
        let result: RedemptionResult = ::serde_json::from_str(&body).unwrap();
        assert!(result.success);
    }

    #[test]
    fn test_not_found_answers_with_json_error() {
        let mut core = Core::new().unwrap();
        let controller = create_controller(&mut core, vec![]);
        let app = Application::new(controller);

        let (status, body) = answer(&mut core, &app, request(Get, "/coupons/NOPE1234", "", ContentType::json()));
        assert_eq!(status, StatusCode::NotFound);
        let message: utils::ErrorMessage = ::serde_json::from_str(&body).unwrap();
        assert_eq!(message.code, 404);
    }

    #[test]
    fn test_delete_used_coupon_is_bad_request() {
        let mut core = Core::new().unwrap();
        let controller = create_controller(
            &mut core,
            vec![coupon_row("BBBBBBBB", "used", 100, "Asha", "2025-07-02T10:00:00+00:00")],
        );
        let app = Application::new(controller);

        let (status, _) = answer(&mut core, &app, request(Delete, "/coupons/BBBBBBBB", "", ContentType::json()));
        assert_eq!(status, StatusCode::BadRequest);
    }

    #[test]
    fn test_invalid_status_filter_is_unprocessable() {
        let mut core = Core::new().unwrap();
        let controller = create_controller(&mut core, vec![]);
        let app = Application::new(controller);

        let (status, _) = answer(&mut core, &app, request(Get, "/coupons?status=lost", "", ContentType::json()));
        assert_eq!(status, StatusCode::UnprocessableEntity);
        let (status, body) = answer(&mut core, &app, request(Get, "/coupons?status=all", "", ContentType::json()));
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, "[]");
    }

    #[test]
    fn test_search_params() {
        let params = parse_query(Some("status=Used&search=+asha+"));
        let search = coupons_search(&params).unwrap();
        assert_eq!(search.status, Some(CouponStatus::Used));
        assert_eq!(search.term, Some("asha".to_string()));
    }
}
