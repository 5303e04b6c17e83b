use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{CartList, ListIdRequest, PutProductRequest, RemovedCount, StagedCount},
        orders::{CreateOrderMultipart, OrderList, OrderWithItems, ReceiptMultipart},
    },
    models::{CartLine, CartLineProduct, Order, OrderItemProduct},
    order_status::OrderStatus,
    repository::StockFilter,
    response::{ApiResponse, Meta},
    routes::{cart, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::put_product,
        cart::list_lines,
        cart::delete_lines,
        cart::move_to_payment,
        cart::item_in_payment,
        orders::create_order,
        orders::list_orders,
        orders::list_my_orders,
        orders::get_order,
        orders::set_reject,
        orders::set_on_the_way,
        orders::set_success
    ),
    components(
        schemas(
            CartLine,
            CartLineProduct,
            Order,
            OrderItemProduct,
            OrderStatus,
            StockFilter,
            PutProductRequest,
            ListIdRequest,
            CartList,
            RemovedCount,
            StagedCount,
            CreateOrderMultipart,
            ReceiptMultipart,
            OrderList,
            OrderWithItems,
            params::Pagination,
            Meta,
            ApiResponse<CartLine>,
            ApiResponse<CartList>,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Basket and payment staging"),
        (name = "Orders", description = "Checkout and order lifecycle"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
