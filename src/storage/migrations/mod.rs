use tokio_postgres::Client;

pub const SCHEMA: &str = r#"
    -- Create decode runs table
    CREATE TABLE IF NOT EXISTS decode_runs (
        id BIGSERIAL PRIMARY KEY,
        capture_file TEXT NOT NULL,
        started_at TIMESTAMPTZ NOT NULL
    );

    -- Create ethernet headers table
    CREATE TABLE IF NOT EXISTS ethernet_headers (
        id BIGSERIAL PRIMARY KEY,
        run_id BIGINT NOT NULL REFERENCES decode_runs (id) ON DELETE CASCADE,
        packet_index BIGINT NOT NULL,
        dst_mac TEXT NOT NULL,
        src_mac TEXT NOT NULL,
        ether_type INTEGER NOT NULL
    );

    -- Create ipv4 headers table
    CREATE TABLE IF NOT EXISTS ipv4_headers (
        id BIGSERIAL PRIMARY KEY,
        ethernet_id BIGINT NOT NULL UNIQUE REFERENCES ethernet_headers (id) ON DELETE CASCADE,
        version SMALLINT NOT NULL,
        header_length SMALLINT NOT NULL,
        type_of_service SMALLINT NOT NULL,
        total_length INTEGER NOT NULL,
        identification INTEGER NOT NULL,
        flags SMALLINT NOT NULL,
        fragment_offset INTEGER NOT NULL,
        time_to_live SMALLINT NOT NULL,
        protocol SMALLINT NOT NULL,
        checksum INTEGER NOT NULL,
        src_addr INET NOT NULL,
        dst_addr INET NOT NULL,
        options NUMERIC
    );

    -- Create indexes
    CREATE INDEX IF NOT EXISTS idx_ethernet_run ON ethernet_headers (run_id, packet_index);
    CREATE INDEX IF NOT EXISTS idx_ipv4_addrs ON ipv4_headers (src_addr, dst_addr);
    CREATE INDEX IF NOT EXISTS idx_ipv4_protocol ON ipv4_headers (protocol);
"#;

pub async fn run_migrations(client: &Client) -> Result<(), tokio_postgres::Error> {
    client.batch_execute(SCHEMA).await
}
