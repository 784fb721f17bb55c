use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use backend::{
    AppState,
    ai::AiClient,
    config::Config,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit, require_admin, require_teacher},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'thesishub_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client.clone());

    // 文本生成服务客户端
    let ai = AiClient::new(&config);

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc,
        ai,
    };

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    // 公开路由：注册和各角色登录
    let public_routes = Router::new()
        .route("/students/register", post(routes::student::register))
        .route("/students/login", post(routes::student::login))
        .route("/teachers/login", post(routes::teacher::login))
        .route("/dashboard/login", post(routes::dashboard::login));

    // 登录后通用路由
    let protected_routes = Router::new()
        // 学生资料
        .route("/students/me", get(routes::student::get_me))
        .route("/students/update-profile", put(routes::student::update_profile))
        .route("/students/search", get(routes::student::search_students))
        .route("/students/invitations", get(routes::group::get_my_invitations))
        // 小组生命周期
        .route("/groups/create", post(routes::group::create_group))
        .route("/groups/my-group", get(routes::group::get_my_group))
        .route("/groups/invite", post(routes::group::invite_student))
        .route(
            "/groups/invitations",
            get(routes::group::get_group_invitations),
        )
        .route(
            "/groups/invitations/respond",
            post(routes::group::respond_to_invitation),
        )
        .route(
            "/groups/invitations/cancel",
            post(routes::group::cancel_invitation),
        )
        .route("/groups/members/remove", post(routes::group::remove_member))
        // 选题书
        .route("/proposals/my", get(routes::proposal::get_my_proposal))
        .route("/proposals/save", post(routes::proposal::save_proposal))
        .route("/proposals/submit", post(routes::proposal::submit_proposal))
        .route("/proposals/ai/title", post(routes::proposal::generate_title))
        .route(
            "/proposals/ai/full-proposal",
            post(routes::proposal::generate_full_proposal),
        )
        .route(
            "/proposals/ai/improve",
            post(routes::proposal::improve_description),
        )
        .route(
            "/proposals/ai/keywords",
            post(routes::proposal::suggest_keywords),
        )
        // 选导师
        .route("/teachers/list", get(routes::teacher::list_teachers))
        .route("/teachers/match", get(routes::teacher::match_teachers))
        // 指导申请（学生侧）
        .route("/requests/send", post(routes::request::send_request))
        .route("/requests/my-group", get(routes::request::get_group_requests))
        // 小组协作
        .route("/messages/create", post(routes::message::create_message))
        .route("/messages/list", get(routes::message::get_messages))
        .route("/meetings/create", post(routes::meeting::create_meeting))
        .route("/meetings/list", get(routes::meeting::get_meetings))
        .route(
            "/meetings/update-status",
            post(routes::meeting::update_meeting_status),
        )
        .route("/tasks/create", post(routes::task::create_task))
        .route("/tasks/list", get(routes::task::get_tasks))
        .route("/tasks/update", post(routes::task::update_task))
        .route("/files/share", post(routes::file::share_file))
        .route("/files/list", get(routes::file::get_files))
        .route("/files/{file_id}", delete(routes::file::delete_file))
        .route("/progress/submit", post(routes::progress::submit_progress))
        .route("/progress/list", get(routes::progress::get_progress_reports));

    // 教师专用路由
    let teacher_routes = Router::new()
        .route("/teachers/me", get(routes::teacher::get_me))
        .route(
            "/teachers/update-profile",
            put(routes::teacher::update_profile),
        )
        .route(
            "/requests/for-teacher",
            get(routes::request::get_teacher_requests),
        )
        .route("/requests/respond", post(routes::request::respond_request))
        .route("/progress/review", post(routes::progress::review_progress))
        .layer(axum::middleware::from_fn(require_teacher));

    // 管理员专用路由
    let admin_routes = Router::new()
        .route("/dashboard/stats", get(routes::dashboard::get_stats))
        .route("/dashboard/all-data", get(routes::dashboard::get_all_data))
        .route("/dashboard/teachers", post(routes::dashboard::create_teacher))
        .route(
            "/dashboard/clear-all/request",
            post(routes::dashboard::request_clear_all),
        )
        .route(
            "/dashboard/clear-all",
            delete(routes::dashboard::confirm_clear_all),
        )
        .route(
            "/requests/pending-admin",
            get(routes::request::get_pending_admin_requests),
        )
        .route("/requests/finalize", post(routes::request::finalize_request))
        .route("/sync/frontend-data", post(routes::sync::import_frontend_data))
        .route("/sync/status", get(routes::sync::sync_status))
        .layer(axum::middleware::from_fn(require_admin));

    let authed_routes = protected_routes
        .merge(teacher_routes)
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        "/api",
        Router::new().merge(public_routes).merge(authed_routes),
    );

    // 添加日志中间件和限流中间件
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        // 开发环境允许所有来源
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
