//! Resource catalog
//!
//! One static descriptor per syncable resource: where it is listed, which
//! fields it projects, what it can do. The engine branches on the
//! [`Capabilities`] flags instead of per-resource code.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resources that can be synced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Product,
    ProductVariant,
    Order,
    Customer,
    Collection,
    Page,
    Location,
    Metaobject,
}

impl ResourceKind {
    /// All resources, in catalog order
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Product,
        ResourceKind::ProductVariant,
        ResourceKind::Order,
        ResourceKind::Customer,
        ResourceKind::Collection,
        ResourceKind::Page,
        ResourceKind::Location,
        ResourceKind::Metaobject,
    ];

    /// Static descriptor for this resource
    pub fn descriptor(self) -> &'static ResourceDescriptor {
        match self {
            ResourceKind::Product => &PRODUCT,
            ResourceKind::ProductVariant => &PRODUCT_VARIANT,
            ResourceKind::Order => &ORDER,
            ResourceKind::Customer => &CUSTOMER,
            ResourceKind::Collection => &COLLECTION,
            ResourceKind::Page => &PAGE,
            ResourceKind::Location => &LOCATION,
            ResourceKind::Metaobject => &METAOBJECT,
        }
    }

    /// Capability flags
    pub fn capabilities(self) -> Capabilities {
        self.descriptor().capabilities
    }

    /// CLI / config name (snake_case)
    pub fn as_str(self) -> &'static str {
        self.descriptor().key
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().name)
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        ResourceKind::ALL
            .into_iter()
            .find(|kind| {
                let d = kind.descriptor();
                d.key == wanted || d.plural == wanted
            })
            .ok_or_else(|| Error::config(format!("Unknown resource: {s}")))
    }
}

/// What a resource supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Custom-field values are fetched through a second protocol
    pub secondary_augmentation: bool,
    /// Records can be created
    pub create: bool,
    /// Records can be updated
    pub update: bool,
    /// Records can be deleted
    pub delete: bool,
}

impl Capabilities {
    const READ_ONLY: Self = Self {
        secondary_augmentation: false,
        create: false,
        update: false,
        delete: false,
    };

    const FULL: Self = Self {
        secondary_augmentation: true,
        create: true,
        update: true,
        delete: true,
    };
}

/// A standard (non custom-field) column
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Row key
    pub key: &'static str,
    /// Dot path inside the raw record
    pub source: &'static str,
    /// Dot path in the REST write payload, if the field is writable
    pub write_as: Option<&'static str>,
    /// Allowed values, empty when unrestricted
    pub choices: &'static [&'static str],
}

impl FieldSpec {
    const fn read(key: &'static str, source: &'static str) -> Self {
        Self {
            key,
            source,
            write_as: None,
            choices: &[],
        }
    }

    const fn write(key: &'static str, source: &'static str) -> Self {
        Self {
            key,
            source,
            write_as: Some(source),
            choices: &[],
        }
    }

    const fn write_as(key: &'static str, source: &'static str, write_as: &'static str) -> Self {
        Self {
            key,
            source,
            write_as: Some(write_as),
            choices: &[],
        }
    }

    const fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }

    /// Whether the field can be written back
    pub fn is_writable(&self) -> bool {
        self.write_as.is_some()
    }
}

/// One REST listing endpoint
#[derive(Debug, Clone, Copy)]
pub struct RestPath {
    /// Path under the versioned admin root, without `.json`
    pub path: &'static str,
    /// Key holding the record array in the response body
    pub root_key: &'static str,
    /// Singular key used to wrap write payloads
    pub singular: &'static str,
    /// Field injected into every record fetched from this path
    pub tag: Option<(&'static str, &'static str)>,
}

/// Where the primary listing comes from
#[derive(Debug, Clone, Copy)]
pub enum PrimarySource {
    /// One or more REST listings walked in order
    Rest(&'static [RestPath]),
    /// A GraphQL connection
    GraphQl {
        /// Query text taking `$first` and `$after` (plus filter variables)
        query: &'static str,
        /// Path of the connection inside `data`
        connection: &'static str,
    },
}

/// Static description of a resource
#[derive(Debug)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// snake_case key
    pub key: &'static str,
    /// Plural form accepted on the command line
    pub plural: &'static str,
    /// Display name
    pub name: &'static str,
    /// GraphQL type tag used in gids
    pub graphql_type: &'static str,
    /// Metafield owner type, when the resource carries metafields
    pub owner_type: Option<&'static str>,
    pub primary: PrimarySource,
    /// REST endpoints used for writes (first one is the default)
    pub write_paths: &'static [RestPath],
    pub capabilities: Capabilities,
    pub fields: &'static [FieldSpec],
    /// Pairs that must be both present or both absent on write
    pub required_together: &'static [(&'static str, &'static str)],
    /// Query parameters applied to the first page unless overridden
    pub default_filters: &'static [(&'static str, &'static str)],
}

impl ResourceDescriptor {
    /// Look up a standard field by row key
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Whether `key` is a standard column
    pub fn is_standard(&self, key: &str) -> bool {
        key == "id" || self.field(key).is_some()
    }

    /// Iterate standard row keys, `id` first
    pub fn standard_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once("id").chain(self.fields.iter().map(|f| f.key))
    }

    /// The REST write endpoint for a record, picked by its tag field
    pub fn write_path_for(&self, raw: &crate::types::JsonObject) -> Option<&'static RestPath> {
        self.write_paths
            .iter()
            .find(|p| match p.tag {
                Some((field, value)) => raw.get(field).and_then(|v| v.as_str()) == Some(value),
                None => false,
            })
            .or_else(|| self.write_paths.first())
    }
}

// ============================================================================
// Descriptors
// ============================================================================

const PRODUCT_PATHS: &[RestPath] = &[RestPath {
    path: "products",
    root_key: "products",
    singular: "product",
    tag: None,
}];

static PRODUCT: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Product,
    key: "product",
    plural: "products",
    name: "Product",
    graphql_type: "Product",
    owner_type: Some("PRODUCT"),
    primary: PrimarySource::Rest(PRODUCT_PATHS),
    write_paths: PRODUCT_PATHS,
    capabilities: Capabilities::FULL,
    fields: &[
        FieldSpec::write("title", "title"),
        FieldSpec::write("handle", "handle"),
        FieldSpec::write("body_html", "body_html"),
        FieldSpec::write("vendor", "vendor"),
        FieldSpec::write("product_type", "product_type"),
        FieldSpec::write("status", "status").choices(&["active", "archived", "draft"]),
        FieldSpec::write("tags", "tags"),
        FieldSpec::write("template_suffix", "template_suffix"),
        FieldSpec::read("image_url", "image.src"),
        FieldSpec::read("created_at", "created_at"),
        FieldSpec::read("updated_at", "updated_at"),
        FieldSpec::write("published_at", "published_at"),
    ],
    required_together: &[],
    default_filters: &[],
};

const VARIANT_WRITE_PATHS: &[RestPath] = &[RestPath {
    path: "variants",
    root_key: "variants",
    singular: "variant",
    tag: None,
}];

static PRODUCT_VARIANT: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::ProductVariant,
    key: "product_variant",
    plural: "variants",
    name: "ProductVariant",
    graphql_type: "ProductVariant",
    owner_type: Some("PRODUCTVARIANT"),
    primary: PrimarySource::GraphQl {
        query: VARIANTS_QUERY,
        connection: "productVariants",
    },
    write_paths: VARIANT_WRITE_PATHS,
    capabilities: Capabilities {
        secondary_augmentation: false,
        create: false,
        update: true,
        delete: true,
    },
    fields: &[
        FieldSpec::write("title", "title"),
        FieldSpec::write("sku", "sku"),
        FieldSpec::write_as("price", "price", "price"),
        FieldSpec::write_as("compare_at_price", "compareAtPrice", "compare_at_price"),
        FieldSpec::write("barcode", "barcode"),
        FieldSpec::read("inventory_quantity", "inventoryQuantity"),
        FieldSpec::read("product_id", "product.id"),
        FieldSpec::read("product_title", "product.title"),
        FieldSpec::write_as(
            "weight",
            "inventoryItem.measurement.weight.value",
            "weight",
        ),
        FieldSpec::write_as(
            "weight_unit",
            "inventoryItem.measurement.weight.unit",
            "weight_unit",
        )
        .choices(&["g", "kg", "oz", "lb", "GRAMS", "KILOGRAMS", "OUNCES", "POUNDS"]),
        FieldSpec::read("created_at", "createdAt"),
        FieldSpec::read("updated_at", "updatedAt"),
    ],
    required_together: &[("weight", "weight_unit")],
    default_filters: &[],
};

const VARIANTS_QUERY: &str = r"query ProductVariants($first: Int!, $after: String, $query: String) {
  productVariants(first: $first, after: $after, query: $query) {
    nodes {
      id
      title
      sku
      price
      compareAtPrice
      barcode
      inventoryQuantity
      createdAt
      updatedAt
      product { id title }
      inventoryItem { measurement { weight { value unit } } }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

const ORDER_PATHS: &[RestPath] = &[RestPath {
    path: "orders",
    root_key: "orders",
    singular: "order",
    tag: None,
}];

static ORDER: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Order,
    key: "order",
    plural: "orders",
    name: "Order",
    graphql_type: "Order",
    owner_type: Some("ORDER"),
    primary: PrimarySource::Rest(ORDER_PATHS),
    write_paths: ORDER_PATHS,
    capabilities: Capabilities {
        secondary_augmentation: true,
        create: false,
        update: true,
        delete: true,
    },
    fields: &[
        FieldSpec::read("name", "name"),
        FieldSpec::write("email", "email"),
        FieldSpec::write("phone", "phone"),
        FieldSpec::write("note", "note"),
        FieldSpec::write("tags", "tags"),
        FieldSpec::read("financial_status", "financial_status"),
        FieldSpec::read("fulfillment_status", "fulfillment_status"),
        FieldSpec::read("total_price", "total_price"),
        FieldSpec::read("currency", "currency"),
        FieldSpec::read("customer_id", "customer.id"),
        FieldSpec::read("created_at", "created_at"),
        FieldSpec::read("closed_at", "closed_at"),
        FieldSpec::read("cancelled_at", "cancelled_at"),
    ],
    required_together: &[],
    default_filters: &[("status", "any")],
};

const CUSTOMER_PATHS: &[RestPath] = &[RestPath {
    path: "customers",
    root_key: "customers",
    singular: "customer",
    tag: None,
}];

static CUSTOMER: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Customer,
    key: "customer",
    plural: "customers",
    name: "Customer",
    graphql_type: "Customer",
    owner_type: Some("CUSTOMER"),
    primary: PrimarySource::Rest(CUSTOMER_PATHS),
    write_paths: CUSTOMER_PATHS,
    capabilities: Capabilities::FULL,
    fields: &[
        FieldSpec::write("first_name", "first_name"),
        FieldSpec::write("last_name", "last_name"),
        FieldSpec::write("email", "email"),
        FieldSpec::write("phone", "phone"),
        FieldSpec::write("note", "note"),
        FieldSpec::write("tags", "tags"),
        FieldSpec::read("state", "state"),
        FieldSpec::read("verified_email", "verified_email"),
        FieldSpec::read("orders_count", "orders_count"),
        FieldSpec::read("total_spent", "total_spent"),
        FieldSpec::read("created_at", "created_at"),
        FieldSpec::read("updated_at", "updated_at"),
    ],
    required_together: &[],
    default_filters: &[],
};

const COLLECTION_PATHS: &[RestPath] = &[
    RestPath {
        path: "custom_collections",
        root_key: "custom_collections",
        singular: "custom_collection",
        tag: Some(("collection_type", "custom")),
    },
    RestPath {
        path: "smart_collections",
        root_key: "smart_collections",
        singular: "smart_collection",
        tag: Some(("collection_type", "smart")),
    },
];

static COLLECTION: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Collection,
    key: "collection",
    plural: "collections",
    name: "Collection",
    graphql_type: "Collection",
    owner_type: Some("COLLECTION"),
    primary: PrimarySource::Rest(COLLECTION_PATHS),
    write_paths: COLLECTION_PATHS,
    capabilities: Capabilities::FULL,
    fields: &[
        FieldSpec::write("title", "title"),
        FieldSpec::write("handle", "handle"),
        FieldSpec::write("body_html", "body_html"),
        FieldSpec::write("sort_order", "sort_order").choices(&[
            "alpha-asc",
            "alpha-desc",
            "best-selling",
            "created",
            "created-desc",
            "manual",
            "price-asc",
            "price-desc",
        ]),
        FieldSpec::write("template_suffix", "template_suffix"),
        FieldSpec::write("image_url", "image.src"),
        FieldSpec::write("image_alt", "image.alt"),
        FieldSpec::read("collection_type", "collection_type"),
        FieldSpec::write("published_at", "published_at"),
        FieldSpec::read("updated_at", "updated_at"),
    ],
    required_together: &[],
    default_filters: &[],
};

const PAGE_PATHS: &[RestPath] = &[RestPath {
    path: "pages",
    root_key: "pages",
    singular: "page",
    tag: None,
}];

static PAGE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Page,
    key: "page",
    plural: "pages",
    name: "Page",
    graphql_type: "OnlineStorePage",
    owner_type: Some("PAGE"),
    primary: PrimarySource::Rest(PAGE_PATHS),
    write_paths: PAGE_PATHS,
    capabilities: Capabilities::FULL,
    fields: &[
        FieldSpec::write("title", "title"),
        FieldSpec::write("handle", "handle"),
        FieldSpec::write("body_html", "body_html"),
        FieldSpec::write("author", "author"),
        FieldSpec::write("template_suffix", "template_suffix"),
        FieldSpec::write("published_at", "published_at"),
        FieldSpec::read("created_at", "created_at"),
        FieldSpec::read("updated_at", "updated_at"),
    ],
    required_together: &[],
    default_filters: &[],
};

const LOCATION_PATHS: &[RestPath] = &[RestPath {
    path: "locations",
    root_key: "locations",
    singular: "location",
    tag: None,
}];

static LOCATION: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Location,
    key: "location",
    plural: "locations",
    name: "Location",
    graphql_type: "Location",
    owner_type: Some("LOCATION"),
    primary: PrimarySource::Rest(LOCATION_PATHS),
    write_paths: LOCATION_PATHS,
    capabilities: Capabilities {
        secondary_augmentation: true,
        ..Capabilities::READ_ONLY
    },
    fields: &[
        FieldSpec::read("name", "name"),
        FieldSpec::read("address1", "address1"),
        FieldSpec::read("address2", "address2"),
        FieldSpec::read("city", "city"),
        FieldSpec::read("zip", "zip"),
        FieldSpec::read("province", "province"),
        FieldSpec::read("country", "country"),
        FieldSpec::read("phone", "phone"),
        FieldSpec::read("active", "active"),
        FieldSpec::read("updated_at", "updated_at"),
    ],
    required_together: &[],
    default_filters: &[],
};

static METAOBJECT: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::Metaobject,
    key: "metaobject",
    plural: "metaobjects",
    name: "Metaobject",
    graphql_type: "Metaobject",
    owner_type: None,
    primary: PrimarySource::GraphQl {
        query: METAOBJECTS_QUERY,
        connection: "metaobjects",
    },
    write_paths: &[],
    capabilities: Capabilities::READ_ONLY,
    fields: &[
        FieldSpec::read("handle", "handle"),
        FieldSpec::read("type", "type"),
        FieldSpec::read("display_name", "displayName"),
        FieldSpec::read("fields", "fields"),
        FieldSpec::read("updated_at", "updatedAt"),
    ],
    required_together: &[],
    default_filters: &[],
};

const METAOBJECTS_QUERY: &str = r"query Metaobjects($first: Int!, $after: String, $type: String!) {
  metaobjects(first: $first, after: $after, type: $type) {
    nodes {
      id
      handle
      type
      displayName
      updatedAt
      fields { key value type }
    }
    pageInfo { hasNextPage endCursor }
  }
}";
