pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS operators (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        email TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS operator_meeting_settings (
        operator_id TEXT PRIMARY KEY,
        booking_slug TEXT NOT NULL,
        slot_duration_minutes INTEGER NOT NULL,
        buffer_before_minutes INTEGER NOT NULL,
        buffer_after_minutes INTEGER NOT NULL,
        max_days_in_advance INTEGER NOT NULL,
        min_notice_value INTEGER NOT NULL,
        min_notice_unit TEXT NOT NULL,
        max_meetings_per_day INTEGER NOT NULL,
        accepting_meetings INTEGER NOT NULL,
        timezone TEXT NOT NULL,
        welcome_message TEXT,
        meeting_title TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS operator_availability (
        operator_id TEXT NOT NULL,
        day_of_week INTEGER NOT NULL,
        enabled INTEGER NOT NULL,
        intervals TEXT NOT NULL,
        PRIMARY KEY (operator_id, day_of_week)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS operator_time_off (
        id TEXT PRIMARY KEY,
        operator_id TEXT NOT NULL,
        title TEXT NOT NULL,
        reason TEXT,
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        recurring INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_time_off_operator ON operator_time_off (operator_id, start_at)",
    r#"
    CREATE TABLE IF NOT EXISTS meetings (
        id TEXT PRIMARY KEY,
        operator_id TEXT NOT NULL,
        meeting_type_id TEXT,
        client_name TEXT NOT NULL,
        client_email TEXT NOT NULL,
        client_phone TEXT,
        client_company TEXT,
        subject TEXT NOT NULL,
        notes TEXT,
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        duration_minutes INTEGER NOT NULL,
        timezone TEXT NOT NULL,
        status TEXT NOT NULL,
        view_token TEXT NOT NULL,
        view_token_expires_at INTEGER NOT NULL,
        cancel_token TEXT NOT NULL,
        cancel_token_expires_at INTEGER NOT NULL,
        reschedule_token TEXT NOT NULL,
        reschedule_token_expires_at INTEGER NOT NULL,
        reschedule_count INTEGER NOT NULL DEFAULT 0,
        original_start_at INTEGER,
        cancelled_at INTEGER,
        cancelled_by TEXT,
        cancellation_reason TEXT,
        rescheduled_at INTEGER,
        rescheduled_by TEXT,
        reschedule_reason TEXT,
        reminder_24h_sent INTEGER NOT NULL DEFAULT 0,
        reminder_1h_sent INTEGER NOT NULL DEFAULT 0,
        source TEXT NOT NULL,
        request_ip TEXT,
        user_agent TEXT,
        dedupe_key TEXT,
        calendar_event_id TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK (end_at > start_at),
        CHECK (reschedule_count BETWEEN 0 AND 2)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_meetings_operator_start ON meetings (operator_id, start_at)",
    "CREATE INDEX IF NOT EXISTS idx_meetings_dedupe ON meetings (operator_id, dedupe_key, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_meetings_status_start ON meetings (status, start_at)",
    r#"
    CREATE TABLE IF NOT EXISTS meeting_audit_log (
        id TEXT PRIMARY KEY,
        meeting_id TEXT NOT NULL,
        action TEXT NOT NULL,
        performed_by TEXT NOT NULL,
        actor_id TEXT,
        ip TEXT,
        user_agent TEXT,
        metadata TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audit_meeting ON meeting_audit_log (meeting_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS calendar_accounts (
        operator_id TEXT PRIMARY KEY,
        provider_email TEXT,
        encrypted_refresh_token TEXT NOT NULL,
        calendar_id TEXT NOT NULL,
        sync_enabled INTEGER NOT NULL DEFAULT 1,
        last_synced_at INTEGER,
        sync_error TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rate_limit_windows (
        ip TEXT PRIMARY KEY,
        request_count INTEGER NOT NULL,
        window_start INTEGER NOT NULL,
        window_end INTEGER NOT NULL
    )
    "#,
];
