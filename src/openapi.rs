use utoipa::OpenApi;

/// OpenAPI document for the CaterBill API, served through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CaterBill API",
        description = "Catering sales, inventory batches, payments and balance reconciliation",
        version = env!("CARGO_PKG_VERSION"),
    ),
    paths(
        crate::handlers::caterers::create_caterer,
        crate::handlers::caterers::list_caterers,
        crate::handlers::caterers::get_caterer,
        crate::handlers::caterers::update_caterer,
        crate::handlers::caterers::delete_caterer,
        crate::handlers::caterers::get_summary,
        crate::handlers::caterers::list_sales,
        crate::handlers::sales::create_sale,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::get_status,
        crate::handlers::sales::override_status,
        crate::handlers::sales::record_payment,
        crate::handlers::sales::list_payments,
        crate::handlers::payments::upload_receipt,
        crate::handlers::receipts::fetch_receipt,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::receive_batch,
        crate::handlers::products::list_batches,
        crate::handlers::products::adjust_batch,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::money::MoneyValue,
        crate::reconcile::CatererSummary,
        crate::reconcile::PaymentStatus,
        crate::services::caterers::CatererListResponse,
        crate::services::caterers::CatererResponse,
        crate::services::caterers::CreateCatererRequest,
        crate::services::caterers::UpdateCatererRequest,
        crate::services::inventory::AdjustBatchRequest,
        crate::services::inventory::BatchResponse,
        crate::services::inventory::CreateProductRequest,
        crate::services::inventory::ProductListResponse,
        crate::services::inventory::ProductResponse,
        crate::services::inventory::ReceiveBatchRequest,
        crate::services::reconciliation::CreateSaleRequest,
        crate::services::reconciliation::LineItemInput,
        crate::services::reconciliation::PaymentResponse,
        crate::services::reconciliation::RecordPaymentRequest,
        crate::services::reconciliation::SaleItemResponse,
        crate::services::reconciliation::SaleResponse,
        crate::handlers::sales::OverrideStatusRequest,
        crate::handlers::sales::StatusResponse,
    )),
    tags(
        (name = "Caterers", description = "Caterer profiles and balance summaries"),
        (name = "Sales", description = "Bills and their effective statuses"),
        (name = "Payments", description = "Payments and receipt images"),
        (name = "Inventory", description = "Products and stock batches"),
    )
)]
pub struct ApiDoc;
