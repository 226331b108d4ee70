use super::{col, ColumnKind::*, TableDescriptor};

pub static DEPARTMENTS: TableDescriptor = TableDescriptor {
    name: "departments",
    create_statement: "CREATE TABLE IF NOT EXISTS departments (
        code INTEGER PRIMARY KEY,
        name VARCHAR(30) NOT NULL
    )",
    insert_statement: "INSERT INTO departments (code, name) ",
    columns: &[col("DP", Integer), col("DPNOM", Text)],
    natural_key: Some(0),
    references: &[],
};

pub static DEPARTMENTS_POPULATION_HISTORY: TableDescriptor = TableDescriptor {
    name: "departmentsPopulationHistory",
    create_statement: "CREATE TABLE IF NOT EXISTS departmentsPopulationHistory (
        id SERIAL PRIMARY KEY,
        year INTEGER,
        women INTEGER,
        men INTEGER,
        department_id INTEGER REFERENCES departments(code)
    )",
    insert_statement: "INSERT INTO departmentsPopulationHistory (year, women, men, department_id) ",
    columns: &[
        col("AÑO", Integer),
        col("Total Mujeres", Integer),
        col("Total Hombres", Integer),
        col("DP", Integer),
    ],
    natural_key: None,
    references: &["departments"],
};

pub static MUNICIPALITIES: TableDescriptor = TableDescriptor {
    name: "municipalities",
    create_statement: "CREATE TABLE IF NOT EXISTS municipalities (
        code INTEGER PRIMARY KEY,
        name VARCHAR(30) NOT NULL,
        latitude NUMERIC,
        longitude NUMERIC,
        department_id INTEGER REFERENCES departments(code)
    )",
    insert_statement: "INSERT INTO municipalities (code, name, latitude, longitude, department_id) ",
    columns: &[
        col("COD_MUNICIPIO", Integer),
        col("MPNOM", Text),
        col("LATITUD", Coordinate),
        col("LONGITUD", Coordinate),
        col("DP", Integer),
    ],
    natural_key: Some(0),
    references: &["departments"],
};

pub static MUNICIPALITY_POPULATION_HISTORY: TableDescriptor = TableDescriptor {
    name: "municipalityPopulationHistory",
    create_statement: "CREATE TABLE IF NOT EXISTS municipalityPopulationHistory (
        id SERIAL PRIMARY KEY,
        year INTEGER,
        total INTEGER,
        municipality_id INTEGER REFERENCES municipalities(code)
    )",
    insert_statement: "INSERT INTO municipalityPopulationHistory (year, total, municipality_id) ",
    columns: &[
        col("AÑO", Integer),
        col("Total", Integer),
        col("COD_MUNICIPIO", Integer),
    ],
    natural_key: None,
    references: &["municipalities"],
};

pub static SUICIDES: TableDescriptor = TableDescriptor {
    name: "suicides",
    create_statement: "CREATE TABLE IF NOT EXISTS suicides (
        id SERIAL PRIMARY KEY,
        year INTEGER,
        count INTEGER,
        municipality_id INTEGER REFERENCES municipalities(code)
    )",
    insert_statement: "INSERT INTO suicides (year, count, municipality_id) ",
    columns: &[
        col("YEAR", Integer),
        col("SUI_COUNTER", Integer),
        col("CODE_MUNICIPIO", Integer),
    ],
    natural_key: None,
    references: &["municipalities"],
};

pub static SUICIDE_ATTEMPTS: TableDescriptor = TableDescriptor {
    name: "suicideAttempts",
    create_statement: "CREATE TABLE IF NOT EXISTS suicideAttempts (
        id SERIAL PRIMARY KEY,
        year INTEGER,
        week INTEGER,
        count INTEGER,
        municipality_id INTEGER REFERENCES municipalities(code)
    )",
    insert_statement: "INSERT INTO suicideAttempts (year, week, count, municipality_id) ",
    columns: &[
        col("YEAR", Integer),
        col("WEEK", Integer),
        col("COUNTER_TRY", Integer),
        col("CODE_MUNICIPIO", Integer),
    ],
    natural_key: None,
    references: &["municipalities"],
};

pub static INTERFAMILY_VIOLENCE: TableDescriptor = TableDescriptor {
    name: "interfamilyViolence",
    create_statement: "CREATE TABLE IF NOT EXISTS interfamilyViolence (
        id SERIAL PRIMARY KEY,
        year INTEGER,
        count INTEGER,
        municipality_id INTEGER REFERENCES municipalities(code)
    )",
    insert_statement: "INSERT INTO interfamilyViolence (year, count, municipality_id) ",
    columns: &[
        col("YEAR", Integer),
        col("CANTIDAD", Integer),
        col("CODE_MUNICIPIO", Integer),
    ],
    natural_key: None,
    references: &["municipalities"],
};
