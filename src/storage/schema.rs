//! Database schema definitions
//!
//! Tables are listed in dependency order: every table appears after the
//! tables its foreign keys reference.

pub const CREATE_USUARIOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS usuarios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email VARCHAR(255) NOT NULL UNIQUE,
    senha_hash VARCHAR(255) NOT NULL,
    nome VARCHAR(255) NOT NULL,
    telefone VARCHAR(20),
    latitude DECIMAL(10,6),
    longitude DECIMAL(10,6),
    tipo VARCHAR(50) NOT NULL,
    ativo BOOLEAN DEFAULT 1,
    data_criacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Vendor profile; removed with its user
pub const CREATE_FEIRANTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feirantes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario_id INTEGER NOT NULL,
    nome_estabelecimento VARCHAR(255) NOT NULL,
    descricao TEXT,
    horario_funcionamento VARCHAR(100),
    dias_funcionamento VARCHAR(100),
    avaliacao_media DECIMAL(3,2) DEFAULT 0.0,
    total_avaliacoes INTEGER DEFAULT 0,
    ativo BOOLEAN DEFAULT 1,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE CASCADE
)
"#;

pub const CREATE_CATEGORIAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categorias (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome VARCHAR(255) NOT NULL UNIQUE,
    descricao TEXT
)
"#;

pub const CREATE_PRODUTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS produtos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feirante_id INTEGER NOT NULL,
    nome VARCHAR(255) NOT NULL,
    descricao TEXT,
    preco DECIMAL(10,2) NOT NULL,
    quantidade_estoque INTEGER DEFAULT 0,
    categoria_id INTEGER NOT NULL,
    latitude DECIMAL(10,6),
    longitude DECIMAL(10,6),
    avaliacao_media DECIMAL(3,2) DEFAULT 0.0,
    total_avaliacoes INTEGER DEFAULT 0,
    ativo BOOLEAN DEFAULT 1,
    data_criacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (feirante_id) REFERENCES feirantes (id) ON DELETE CASCADE,
    FOREIGN KEY (categoria_id) REFERENCES categorias (id)
)
"#;

pub const CREATE_AVALIACOES_FEIRANTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS avaliacoes_feirantes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feirante_id INTEGER NOT NULL,
    usuario_id INTEGER NOT NULL,
    nota DECIMAL(2,1) NOT NULL CHECK (nota >= 0 AND nota <= 5),
    comentario TEXT,
    data_avaliacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (feirante_id) REFERENCES feirantes (id) ON DELETE CASCADE,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE CASCADE,
    UNIQUE(feirante_id, usuario_id)
)
"#;

pub const CREATE_AVALIACOES_PRODUTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS avaliacoes_produtos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    produto_id INTEGER NOT NULL,
    usuario_id INTEGER NOT NULL,
    nota DECIMAL(2,1) NOT NULL CHECK (nota >= 0 AND nota <= 5),
    comentario TEXT,
    data_avaliacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (produto_id) REFERENCES produtos (id) ON DELETE CASCADE,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE CASCADE,
    UNIQUE(produto_id, usuario_id)
)
"#;

/// Messages keep living when the referenced product goes away
pub const CREATE_MENSAGENS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mensagens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remetente_id INTEGER NOT NULL,
    destinatario_id INTEGER NOT NULL,
    produto_id INTEGER,
    mensagem TEXT NOT NULL,
    lida BOOLEAN DEFAULT 0,
    data_envio TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (remetente_id) REFERENCES usuarios (id) ON DELETE CASCADE,
    FOREIGN KEY (destinatario_id) REFERENCES usuarios (id) ON DELETE CASCADE,
    FOREIGN KEY (produto_id) REFERENCES produtos (id) ON DELETE SET NULL
)
"#;

pub const CREATE_PEDIDOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pedidos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario_id INTEGER NOT NULL,
    feirante_id INTEGER NOT NULL,
    numero_pedido VARCHAR(100) UNIQUE NOT NULL,
    status VARCHAR(50) NOT NULL,
    valor_total DECIMAL(10,2) NOT NULL,
    metodo_pagamento VARCHAR(50) NOT NULL,
    status_pagamento VARCHAR(50) NOT NULL,
    data_criacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id),
    FOREIGN KEY (feirante_id) REFERENCES feirantes (id)
)
"#;

pub const CREATE_ITENS_PEDIDO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS itens_pedido (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pedido_id INTEGER NOT NULL,
    produto_id INTEGER NOT NULL,
    quantidade INTEGER NOT NULL,
    preco_unitario DECIMAL(10,2) NOT NULL,
    FOREIGN KEY (pedido_id) REFERENCES pedidos (id) ON DELETE CASCADE,
    FOREIGN KEY (produto_id) REFERENCES produtos (id)
)
"#;

/// One cart per user. The UNIQUE on usuario_id is what serializes
/// concurrent first adds for the same user.
pub const CREATE_CARRINHOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS carrinhos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario_id INTEGER NOT NULL UNIQUE,
    data_criacao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE CASCADE
)
"#;

pub const CREATE_ITENS_CARRINHO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS itens_carrinho (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    carrinho_id INTEGER NOT NULL,
    produto_id INTEGER NOT NULL,
    quantidade INTEGER NOT NULL,
    FOREIGN KEY (carrinho_id) REFERENCES carrinhos (id) ON DELETE CASCADE,
    FOREIGN KEY (produto_id) REFERENCES produtos (id),
    UNIQUE(carrinho_id, produto_id)
)
"#;

pub const CREATE_HISTORICO_BUSCAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS historico_buscas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario_id INTEGER,
    termo_busca VARCHAR(255) NOT NULL,
    latitude DECIMAL(10,6),
    longitude DECIMAL(10,6),
    data_busca TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE SET NULL
)
"#;

pub const CREATE_LOG_ACOES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS log_acoes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    usuario_id INTEGER,
    acao VARCHAR(255) NOT NULL,
    detalhes TEXT,
    data_acao TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    ip_address VARCHAR(45),
    FOREIGN KEY (usuario_id) REFERENCES usuarios (id) ON DELETE SET NULL
)
"#;

/// Table names in creation order
pub const TABLE_NAMES: &[&str] = &[
    "usuarios",
    "feirantes",
    "categorias",
    "produtos",
    "avaliacoes_feirantes",
    "avaliacoes_produtos",
    "mensagens",
    "pedidos",
    "itens_pedido",
    "carrinhos",
    "itens_carrinho",
    "historico_buscas",
    "log_acoes",
];

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_usuarios_email ON usuarios(email)",
    "CREATE INDEX IF NOT EXISTS idx_usuarios_tipo ON usuarios(tipo)",
    "CREATE INDEX IF NOT EXISTS idx_usuarios_localizacao ON usuarios(latitude, longitude)",
    "CREATE INDEX IF NOT EXISTS idx_produtos_feirante ON produtos(feirante_id)",
    "CREATE INDEX IF NOT EXISTS idx_produtos_categoria ON produtos(categoria_id)",
    "CREATE INDEX IF NOT EXISTS idx_produtos_preco ON produtos(preco)",
    "CREATE INDEX IF NOT EXISTS idx_produtos_avaliacao ON produtos(avaliacao_media)",
    "CREATE INDEX IF NOT EXISTS idx_produtos_localizacao ON produtos(latitude, longitude)",
    "CREATE INDEX IF NOT EXISTS idx_pedidos_usuario ON pedidos(usuario_id)",
    "CREATE INDEX IF NOT EXISTS idx_pedidos_feirante ON pedidos(feirante_id)",
    "CREATE INDEX IF NOT EXISTS idx_pedidos_status ON pedidos(status)",
    "CREATE INDEX IF NOT EXISTS idx_pedidos_data ON pedidos(data_criacao)",
    "CREATE INDEX IF NOT EXISTS idx_avaliacoes_feirante ON avaliacoes_feirantes(feirante_id)",
    "CREATE INDEX IF NOT EXISTS idx_avaliacoes_produto ON avaliacoes_produtos(produto_id)",
    "CREATE INDEX IF NOT EXISTS idx_mensagens_remetente ON mensagens(remetente_id)",
    "CREATE INDEX IF NOT EXISTS idx_mensagens_destinatario ON mensagens(destinatario_id)",
    "CREATE INDEX IF NOT EXISTS idx_historico_usuario ON historico_buscas(usuario_id)",
];

/// Categories inserted by [`super::SchemaManager::seed_sample_data`]
pub const SEED_CATEGORIES: &[(&str, &str)] = &[
    ("Frutas", "Frutas frescas e variadas"),
    ("Verduras", "Verduras e legumes frescos"),
    ("Laticínios", "Queijos, iogurtes e derivados do leite"),
    ("Padaria", "Pães, bolos e produtos de padaria"),
    ("Orgânicos", "Produtos cultivados sem agrotóxicos"),
];

pub const INSERT_CATEGORY_IGNORE: &str =
    "INSERT OR IGNORE INTO categorias (nome, descricao) VALUES (?1, ?2)";

/// All table creation statements, in dependency order
pub fn table_statements() -> Vec<&'static str> {
    vec![
        CREATE_USUARIOS_TABLE,
        CREATE_FEIRANTES_TABLE,
        CREATE_CATEGORIAS_TABLE,
        CREATE_PRODUTOS_TABLE,
        CREATE_AVALIACOES_FEIRANTES_TABLE,
        CREATE_AVALIACOES_PRODUTOS_TABLE,
        CREATE_MENSAGENS_TABLE,
        CREATE_PEDIDOS_TABLE,
        CREATE_ITENS_PEDIDO_TABLE,
        CREATE_CARRINHOS_TABLE,
        CREATE_ITENS_CARRINHO_TABLE,
        CREATE_HISTORICO_BUSCAS_TABLE,
        CREATE_LOG_ACOES_TABLE,
    ]
}
