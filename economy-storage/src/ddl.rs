// SPDX-License-Identifier: Apache-2.0, MIT
//! Idempotent `CREATE TABLE IF NOT EXISTS` statements for the tables named in
//! spec.md §6. The schema's evolution (migrations, indices tuned for
//! production load) is an external collaborator; this is the bootstrap floor
//! C10 needs to run against a bare database.

pub const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS global_settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS season_calibration (
        season_id TEXT PRIMARY KEY,
        seed BIGINT NOT NULL,
        p0 BIGINT NOT NULL,
        c_base BIGINT NOT NULL,
        alpha DOUBLE PRECISION NOT NULL,
        s_scale DOUBLE PRECISION NOT NULL,
        g_scale DOUBLE PRECISION NOT NULL,
        beta DOUBLE PRECISION NOT NULL,
        gamma DOUBLE PRECISION NOT NULL,
        daily_login_reward BIGINT NOT NULL,
        daily_login_cooldown_hours BIGINT NOT NULL,
        activity_reward BIGINT NOT NULL,
        activity_cooldown_seconds BIGINT NOT NULL,
        daily_cap_early BIGINT NOT NULL,
        daily_cap_late BIGINT NOT NULL,
        passive_active_interval_seconds BIGINT NOT NULL,
        passive_idle_interval_seconds BIGINT NOT NULL,
        passive_active_amount BIGINT NOT NULL,
        passive_idle_amount BIGINT NOT NULL,
        hope_threshold DOUBLE PRECISION NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS season_economy (
        season_id TEXT PRIMARY KEY,
        global_coin_pool BIGINT NOT NULL DEFAULT 0,
        coins_distributed BIGINT NOT NULL DEFAULT 0,
        emission_remainder DOUBLE PRECISION NOT NULL DEFAULT 0,
        market_pressure DOUBLE PRECISION NOT NULL DEFAULT 1.0,
        price_floor BIGINT NOT NULL DEFAULT 0,
        current_star_price BIGINT NOT NULL DEFAULT 0,
        current_price_tick BIGINT NOT NULL DEFAULT 0,
        daily_emission_target BIGINT NOT NULL DEFAULT 0,
        stars_sold BIGINT NOT NULL DEFAULT 0,
        last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS accounts (
        account_id TEXT PRIMARY KEY,
        player_id TEXT,
        username TEXT UNIQUE,
        role TEXT NOT NULL DEFAULT 'player',
        admin_key_hash TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS players (
        player_id TEXT PRIMARY KEY,
        coins BIGINT NOT NULL DEFAULT 0,
        stars BIGINT NOT NULL DEFAULT 0,
        daily_earn_total BIGINT NOT NULL DEFAULT 0,
        last_earn_reset_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_active_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        activity_warmup_level DOUBLE PRECISION NOT NULL DEFAULT 0,
        activity_warmup_updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        recent_activity_seconds BIGINT NOT NULL DEFAULT 0,
        drip_multiplier DOUBLE PRECISION NOT NULL DEFAULT 1.0,
        drip_paused BOOLEAN NOT NULL DEFAULT FALSE,
        is_bot BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS player_faucet_claims (
        player_id TEXT NOT NULL,
        faucet_key TEXT NOT NULL,
        last_claim_at TIMESTAMPTZ NOT NULL,
        claim_count BIGINT NOT NULL DEFAULT 1,
        PRIMARY KEY (player_id, faucet_key)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS star_purchase_log (
        id BIGSERIAL PRIMARY KEY,
        season_id TEXT NOT NULL,
        player_id TEXT NOT NULL,
        price_paid BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS coin_earning_log (
        id BIGSERIAL PRIMARY KEY,
        player_id TEXT NOT NULL,
        source_type TEXT NOT NULL,
        amount BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS player_abuse_state (
        player_id TEXT NOT NULL,
        season_id TEXT NOT NULL,
        score DOUBLE PRECISION NOT NULL DEFAULT 0,
        severity SMALLINT NOT NULL DEFAULT 0,
        last_signal_at TIMESTAMPTZ,
        last_decay_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        persistent_until TIMESTAMPTZ,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (player_id, season_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS account_abuse_reputation (
        account_id TEXT PRIMARY KEY,
        score DOUBLE PRECISION NOT NULL DEFAULT 0,
        severity SMALLINT NOT NULL DEFAULT 0,
        last_signal_at TIMESTAMPTZ,
        last_decay_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        persistent_until TIMESTAMPTZ,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS abuse_events (
        id BIGSERIAL PRIMARY KEY,
        account_id TEXT,
        player_id TEXT NOT NULL,
        season_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        severity SMALLINT NOT NULL,
        score_delta DOUBLE PRECISION NOT NULL,
        details JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS player_ip_associations (
        player_id TEXT NOT NULL,
        ip TEXT NOT NULL,
        last_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (player_id, ip)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS season_end_snapshots (
        season_id TEXT PRIMARY KEY,
        snapshot JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS season_final_rankings (
        season_id TEXT NOT NULL,
        player_id TEXT NOT NULL,
        rank BIGINT NOT NULL,
        score DOUBLE PRECISION NOT NULL,
        PRIMARY KEY (season_id, player_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS notifications (
        id BIGSERIAL PRIMARY KEY,
        role TEXT NOT NULL,
        category TEXT NOT NULL,
        type TEXT NOT NULL,
        priority TEXT NOT NULL,
        message TEXT NOT NULL,
        payload JSONB NOT NULL DEFAULT '{}'::jsonb,
        dedup_key TEXT,
        dedup_window_seconds BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS player_telemetry (
        id BIGSERIAL PRIMARY KEY,
        player_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
];
