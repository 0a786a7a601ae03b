diesel::table! {
    workspaces (id) {
        id -> Int8,
        creator_id -> Int8,
        plan -> Text,
        remaining_balance_cents -> Int8,
        invoice_due -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Int8,
        email -> Text,
        provider_customer_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workspaces_users (id) {
        id -> Int8,
        workspace_id -> Int8,
        user_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Int8,
        workspace_id -> Int8,
        current_plan_id -> Int8,
        scheduled_plan_id -> Nullable<Int8>,
        scheduled_effective_at -> Nullable<Timestamptz>,
        provider_subscription_id -> Nullable<Text>,
        billing_cycle -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    service_plans (id) {
        id -> Int8,
        key_name -> Text,
        base_cost_cents -> Int8,
        minutes_per_month -> Float8,
        recording_space_bytes -> Float8,
        fax_units -> Float8,
        pay_as_you_go -> Bool,
        annual_cost_cents -> Int8,
    }
}

diesel::table! {
    users_debits (id) {
        id -> Int8,
        source -> Text,
        status -> Text,
        cents -> Int8,
        module_id -> Int8,
        user_id -> Int8,
        workspace_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users_invoices (id) {
        id -> Int8,
        cents -> Int8,
        cents_including_taxes -> Int8,
        call_costs -> Int8,
        recording_costs -> Int8,
        fax_costs -> Int8,
        membership_costs -> Int8,
        number_costs -> Int8,
        status -> Text,
        source -> Text,
        cents_collected -> Int8,
        confirmation_number -> Nullable<Text>,
        num_attempts -> Int4,
        last_attempted -> Nullable<Timestamptz>,
        tax_metadata -> Jsonb,
        user_id -> Int8,
        workspace_id -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users_cards (id) {
        id -> Int8,
        workspace_id -> Int8,
        provider_payment_method_id -> Text,
        #[sql_name = "primary"]
        is_primary -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    did_numbers (id) {
        id -> Int8,
        workspace_id -> Int8,
        monthly_cost_cents -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    calls (id) {
        id -> Int8,
        workspace_id -> Int8,
        duration_seconds -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    recordings (id) {
        id -> Int8,
        user_id -> Int8,
        size_bytes -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    faxes (id) {
        id -> Int8,
        workspace_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    customizations (id) {
        id -> Int8,
        payment_gateway -> Text,
        billing_retry_attempts -> Int4,
        recordings_cents_per_byte -> Float8,
        fax_cents_per_unit -> Float8,
    }
}

diesel::table! {
    api_credentials (id) {
        id -> Int8,
        stripe_private_key -> Text,
        braintree_api_key -> Nullable<Text>,
    }
}

diesel::joinable!(subscriptions -> workspaces (workspace_id));
diesel::joinable!(workspaces_users -> workspaces (workspace_id));
diesel::joinable!(users_invoices -> workspaces (workspace_id));

diesel::allow_tables_to_appear_in_same_query!(
    workspaces,
    users,
    workspaces_users,
    subscriptions,
    service_plans,
    users_debits,
    users_invoices,
    users_cards,
    did_numbers,
    calls,
    recordings,
    faxes,
    customizations,
    api_credentials,
);
