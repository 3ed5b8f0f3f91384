/// Generate Markdown documentation for the marketplace API
pub fn generate_markdown_docs() -> String {
    let mut markdown = String::new();

    markdown.push_str("# TradeHub API Documentation\n\n");
    markdown.push_str("## Overview\n\n");
    markdown.push_str("TradeHub is a B2B marketplace backend. This API covers admin operations (escrow oversight, shipment tracking, seller/buyer verification review, wholesale product configuration) and storefront operations (notifications, order acceptance, verification submission).\n\n");

    markdown.push_str("## Table of Contents\n\n");
    markdown.push_str("- [Authentication](#authentication)\n");
    markdown.push_str("- [Admin Endpoints](#admin-endpoints)\n");
    markdown.push_str("- [Notifications](#notifications)\n");
    markdown.push_str("- [Orders](#orders)\n");
    markdown.push_str("- [Verification](#verification)\n");
    markdown.push_str("- [Error Codes](#error-codes)\n\n");

    markdown.push_str("## Authentication\n\n");
    markdown.push_str("All endpoints require a bearer token issued by the platform identity provider:\n\n");
    markdown.push_str("```http\nAuthorization: Bearer <token>\n```\n\n");
    markdown.push_str("Admin endpoints additionally require the token's `role` claim to be `admin`.\n\n");

    markdown.push_str("## Base URL\n\n");
    markdown.push_str("```\nhttp://localhost:8080/api\n```\n\n");

    markdown.push_str("## Pagination\n\n");
    markdown.push_str("List endpoints accept `status`, `limit` (default 20, max 100) and `offset` query parameters. Responses carry the result collection, the total `count` for the filter, and the effective `limit`/`offset`. Results are sorted newest first.\n\n");

    markdown.push_str("## Admin Endpoints\n\n");

    markdown.push_str("### GET /api/admin/escrows\n\n");
    markdown.push_str("**Description:** List escrow transactions, optionally filtered by status (`held`, `released`, `refunded`, `disputed`)\n\n");
    markdown.push_str("**Response:**\n```json\n{\n  \"escrows\": [\n    {\n      \"id\": \"uuid\",\n      \"order_id\": \"uuid\",\n      \"amount\": \"1250.00\",\n      \"currency\": \"USD\",\n      \"status\": \"held\",\n      \"created_at\": \"2024-01-01T00:00:00Z\"\n    }\n  ],\n  \"count\": 42,\n  \"limit\": 20,\n  \"offset\": 0\n}\n```\n\n");

    markdown.push_str("### POST /api/admin/escrows/{id}/release\n\n");
    markdown.push_str("**Description:** Release a held escrow to the seller. Only `held` escrows can be released (409 otherwise).\n\n");

    markdown.push_str("### POST /api/admin/escrows/{id}/refund\n\n");
    markdown.push_str("**Description:** Refund a held escrow to the buyer. Only `held` escrows can be refunded (409 otherwise).\n\n");

    markdown.push_str("### GET /api/admin/shipments\n\n");
    markdown.push_str("**Description:** List shipment tracking records, optionally filtered by status (`pending`, `in_transit`, `out_for_delivery`, `delivered`, `failed`)\n\n");
    markdown.push_str("**Response:**\n```json\n{\n  \"shipments\": [\n    {\n      \"id\": \"uuid\",\n      \"order_id\": \"uuid\",\n      \"carrier\": \"DHL\",\n      \"tracking_number\": \"JD014600003828\",\n      \"status\": \"in_transit\",\n      \"events\": [{\"status\": \"in_transit\", \"location\": \"Leipzig\", \"occurred_at\": \"2024-01-02T08:00:00Z\"}]\n    }\n  ],\n  \"count\": 7,\n  \"limit\": 20,\n  \"offset\": 0\n}\n```\n\n");

    markdown.push_str("### GET /api/admin/verifications\n\n");
    markdown.push_str("**Description:** List verification submissions, optionally filtered by status (`pending`, `approved`, `rejected`)\n\n");

    markdown.push_str("### POST /api/admin/verifications/{id}/review\n\n");
    markdown.push_str("**Description:** Approve or reject a pending submission. Rejections require a reason.\n\n");
    markdown.push_str("**Request Body:**\n```json\n{\n  \"approve\": false,\n  \"rejection_reason\": \"Document scan is unreadable\"\n}\n```\n\n");

    markdown.push_str("### GET /api/admin/products/{product_id}/b2b-config\n\n");
    markdown.push_str("**Description:** Fetch the wholesale configuration for a product (404 if none)\n\n");

    markdown.push_str("### PUT /api/admin/products/{product_id}/b2b-config\n\n");
    markdown.push_str("**Description:** Create or replace the wholesale configuration for a product\n\n");
    markdown.push_str("**Request Body:**\n```json\n{\n  \"min_order_quantity\": 50,\n  \"lead_time_days\": 14,\n  \"bulk_pricing_tiers\": [\n    {\"quantity\": 50, \"unit_price\": \"9.50\"},\n    {\"quantity\": 200, \"unit_price\": \"8.25\"}\n  ],\n  \"b2b_only\": true,\n  \"unit_of_measure\": \"case\",\n  \"availability\": \"in_stock\"\n}\n```\n\n");

    markdown.push_str("## Notifications\n\n");

    markdown.push_str("### GET /api/notifications\n\n");
    markdown.push_str("**Description:** List the authenticated user's notifications, newest first\n\n");

    markdown.push_str("### GET /api/notifications/unread\n\n");
    markdown.push_str("**Description:** Count of unread notifications\n\n");
    markdown.push_str("**Response:**\n```json\n{\n  \"count\": 3\n}\n```\n\n");

    markdown.push_str("### POST /api/notifications/{id}/read\n\n");
    markdown.push_str("**Description:** Mark one notification as read. Returns 403 if it belongs to another user.\n\n");

    markdown.push_str("### POST /api/notifications/read-all\n\n");
    markdown.push_str("**Description:** Mark all of the user's notifications as read\n\n");

    markdown.push_str("## Orders\n\n");

    markdown.push_str("### POST /api/orders/{id}/accept\n\n");
    markdown.push_str("**Description:** Seller accepts a pending order. Transitions the order to `accepted`, holds the order total in escrow, and notifies the buyer. Only the order's seller may call this (403 otherwise); non-pending orders return 409.\n\n");
    markdown.push_str("**Response:**\n```json\n{\n  \"order\": {\"id\": \"uuid\", \"status\": \"accepted\"},\n  \"escrow\": {\"id\": \"uuid\", \"status\": \"held\"},\n  \"message\": \"Order accepted\"\n}\n```\n\n");

    markdown.push_str("## Verification\n\n");

    markdown.push_str("### POST /api/verifications\n\n");
    markdown.push_str("**Description:** Submit identity documents for seller or buyer verification. One pending submission per user (409 on duplicate).\n\n");
    markdown.push_str("**Request Body:**\n```json\n{\n  \"profile_type\": \"seller\",\n  \"document_urls\": [\"https://cdn.example/docs/registration.pdf\"]\n}\n```\n\n");

    markdown.push_str("## Error Codes\n\n");
    markdown.push_str("| Status | Meaning |\n");
    markdown.push_str("|--------|---------|\n");
    markdown.push_str("| 400 | Validation failure (bad status filter, invalid URLs, bad tier ladder) |\n");
    markdown.push_str("| 401 | Missing or invalid bearer token |\n");
    markdown.push_str("| 403 | Ownership mismatch or missing admin role |\n");
    markdown.push_str("| 404 | Entity not found |\n");
    markdown.push_str("| 409 | Invalid state transition (already reviewed, escrow not held, order not pending) |\n");
    markdown.push_str("| 429 | Rate limit exceeded |\n");
    markdown.push_str("| 500 | Internal error |\n\n");
    markdown.push_str("All error bodies have the shape `{\"error\": \"<message>\"}`.\n");

    markdown
}

/// Landing page for the documentation routes.
pub fn generate_documentation_html() -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<title>TradeHub API Documentation</title>\n");
    html.push_str("<meta charset=\"utf-8\"/>\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<style>\n");
    html.push_str("body { font-family: -apple-system, sans-serif; margin: 0; padding: 2rem; max-width: 760px; margin: 0 auto; color: #222; }\n");
    html.push_str("h1 { border-bottom: 2px solid #eee; padding-bottom: 0.5rem; }\n");
    html.push_str("a.card { display: block; border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin: 0.75rem 0; text-decoration: none; color: inherit; }\n");
    html.push_str("a.card:hover { border-color: #888; }\n");
    html.push_str("code { background: #f4f4f4; padding: 0.1rem 0.3rem; border-radius: 4px; }\n");
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<h1>TradeHub API</h1>\n");
    html.push_str("<p>B2B marketplace backend: escrow oversight, shipment tracking, verification review, wholesale product configuration, notifications and order acceptance.</p>\n");
    html.push_str("<a class=\"card\" href=\"/api/docs\"><strong>Swagger UI</strong><br/>Interactive API explorer</a>\n");
    html.push_str("<a class=\"card\" href=\"/api/redoc\"><strong>Redoc</strong><br/>Reference documentation</a>\n");
    html.push_str("<a class=\"card\" href=\"/docs/openapi.json\"><strong>OpenAPI JSON</strong><br/>Machine-readable specification</a>\n");
    html.push_str("<a class=\"card\" href=\"/docs/markdown\"><strong>Markdown</strong><br/>Downloadable documentation</a>\n");
    html.push_str("<p>Authenticate with <code>Authorization: Bearer &lt;token&gt;</code>.</p>\n");
    html.push_str("</body>\n</html>\n");
    html
}
