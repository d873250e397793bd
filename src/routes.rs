use crate::{
    api::{attendance, payroll, settings, shifts},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::Context;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP quotas, built once at startup. Every `Governor` made from the same
/// config shares its buckets.
#[derive(Clone)]
pub struct RateLimits {
    punch: LimiterConfig,
    admin: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            punch: build_limiter(config.rate_punch_per_min)
                .with_context(|| format!("invalid punch rate limit {}", config.rate_punch_per_min))?,
            admin: build_limiter(config.rate_admin_per_min)
                .with_context(|| format!("invalid admin rate limit {}", config.rate_admin_per_min))?,
        })
    }
}

/// Quota of `requests_per_min` with a full-minute burst.
fn build_limiter(requests_per_min: u32) -> Option<LimiterConfig> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limits: &RateLimits) {
    let (punch, admin) = (&limits.punch, &limits.admin);

    cfg.service(
        web::scope(api_prefix)
            .service(
                web::scope("/attendance")
                    // punches from terminals and self-service
                    .service(
                        web::resource("/check-in")
                            .wrap(Governor::new(punch))
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out")
                            .wrap(Governor::new(punch))
                            .route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/break/start")
                            .wrap(Governor::new(punch))
                            .route(web::post().to(attendance::break_start)),
                    )
                    .service(
                        web::resource("/break/end")
                            .wrap(Governor::new(punch))
                            .route(web::post().to(attendance::break_end)),
                    )
                    // /attendance/recalculate/{employee_id}?date=
                    .service(
                        web::resource("/recalculate/{employee_id}")
                            .wrap(Governor::new(admin))
                            .route(web::post().to(attendance::recalculate)),
                    )
                    .service(
                        web::resource("/lock/{employee_id}")
                            .wrap(Governor::new(admin))
                            .route(web::post().to(attendance::lock_day)),
                    )
                    .service(
                        web::resource("/unlock/{employee_id}")
                            .wrap(Governor::new(admin))
                            .route(web::post().to(attendance::unlock_day)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .wrap(Governor::new(admin))
                    .service(
                        web::resource("/generate")
                            .route(web::post().to(payroll::generate_payroll)),
                    )
                    .service(
                        web::resource("/generate-bulk")
                            .route(web::post().to(payroll::generate_bulk)),
                    ),
            )
            .service(
                web::scope("/settings")
                    .wrap(Governor::new(admin))
                    .service(
                        web::resource("/payroll-policy")
                            .route(web::get().to(settings::get_payroll_policy))
                            .route(web::put().to(settings::update_payroll_policy)),
                    )
                    .service(
                        web::resource("/attendance-policy")
                            .route(web::get().to(settings::get_attendance_policy))
                            .route(web::post().to(settings::create_attendance_policy)),
                    ),
            )
            .service(
                web::scope("/shifts")
                    .wrap(Governor::new(admin))
                    .service(web::resource("").route(web::post().to(shifts::create_shift)))
                    // registered before /{id} so it is matched first
                    .service(
                        web::resource("/assign").route(web::post().to(shifts::assign_shift)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(shifts::deactivate_shift)),
                    ),
            ),
    );
}
