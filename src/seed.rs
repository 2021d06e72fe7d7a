//! Built-in catalogue of common ingredients, grouped by category.

use serde::Serialize;

use crate::candidates::CandidateRetriever;
use crate::resolver::{DedupResolver, ResolveError};

pub const CATALOGUE: &[(&str, &[&str])] = &[
    (
        "Meat and Protein",
        &[
            "chicken", "beef", "pork", "fish", "shrimp", "tofu", "tempeh", "lentils", "beans",
            "chickpeas", "eggs", "turkey", "salmon", "tuna", "sausage", "bacon", "ham", "steak",
            "ground beef", "pepperoni", "crab", "lobster", "duck", "lamb",
        ],
    ),
    (
        "Grains",
        &[
            "flour", "noodles", "rice", "pasta", "quinoa", "oats", "bread", "barley", "couscous",
            "bulgur", "cornmeal", "wheat germ", "breadcrumbs", "polenta", "farro", "cereal",
            "buckwheat", "millet", "amaranth", "sorghum", "spelt", "teff",
        ],
    ),
    (
        "Vegetables",
        &[
            "spring onion", "onion", "garlic", "tomato", "potato", "carrot", "bell pepper",
            "spinach", "broccoli", "mushroom", "zucchini", "cucumber", "celery", "lettuce",
            "cabbage", "green beans", "peas", "corn", "sweet potato", "asparagus", "kale",
            "brussels sprouts", "cauliflower", "artichoke", "beet", "radish", "turnip",
            "eggplant", "squash", "pumpkin", "okra", "rhubarb", "fennel", "leek", "shallot",
            "scallion", "chives", "ginger", "chili pepper", "jalapeno",
        ],
    ),
    (
        "Fruits",
        &[
            "apple", "banana", "orange", "strawberry", "blueberry", "lemon", "lime", "grape",
            "watermelon", "pineapple", "mango", "kiwi", "peach", "pear", "raspberry",
            "blackberry", "avocado", "cranberry", "cherry", "coconut", "pomegranate", "plum",
            "fig", "date", "guava", "papaya", "passion fruit", "lychee", "dragonfruit",
            "starfruit",
        ],
    ),
    (
        "Dairy and Alternatives",
        &[
            "milk", "cheese", "yogurt", "butter", "cream", "sour cream", "cream cheese",
            "cottage cheese", "ricotta", "goat cheese", "cheddar", "mozzarella", "parmesan",
            "feta", "swiss cheese", "almond milk", "soy milk", "coconut milk", "cashew milk",
            "oat milk", "vegan cheese",
        ],
    ),
    (
        "Herbs and Spices",
        &[
            "salt", "pepper", "oregano", "basil", "parsley", "thyme", "sesame seeds", "rosemary",
            "cumin", "paprika", "chili powder", "cinnamon", "nutmeg", "coriander",
            "garlic powder", "onion powder", "bay leaf", "turmeric", "sage", "dill", "mustard",
            "cayenne", "curry powder", "cardamom", "cloves", "allspice", "tarragon",
        ],
    ),
    (
        "Sauces",
        &[
            "soy sauce", "vinegar", "black vinegar", "rice vinegar", "fish sauce",
            "worcestershire sauce", "teriyaki sauce", "hot sauce", "barbecue sauce", "ketchup",
            "mayonnaise", "relish", "salsa", "tahini", "hoisin sauce", "sriracha",
        ],
    ),
    ("Oils", &["oil", "olive oil", "coconut oil", "sesame oil"]),
    (
        "Nuts",
        &[
            "peanut butter", "almonds", "walnuts", "cashews", "peanuts", "pecans", "pistachios",
            "macadamia nuts", "hazelnuts", "brazil nuts",
        ],
    ),
    (
        "Juice",
        &[
            "orange juice", "apple juice", "grape juice", "cranberry juice", "pineapple juice",
            "tomato juice", "lemon juice", "lime juice", "vegetable juice", "prune juice",
        ],
    ),
    (
        "Sweeteners",
        &[
            "sugar", "brown sugar", "honey", "maple syrup", "agave nectar", "molasses",
            "artificial sweeteners",
        ],
    ),
    (
        "Canned Foods",
        &[
            "canned beans", "canned tomatoes", "canned tuna", "canned salmon",
            "canned vegetables", "canned fruit", "canned soup", "canned broth",
            "canned coconut milk", "canned pumpkin", "canned olives", "canned corn",
            "canned chickpeas",
        ],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}

/// Force-create every catalogue entry whose normalized name is not stored yet.
pub fn seed(
    resolver: &DedupResolver,
    retriever: &CandidateRetriever,
    catalogue: &[(&str, &[&str])],
) -> Result<SeedReport, ResolveError> {
    let mut report = SeedReport::default();

    for (category, names) in catalogue {
        for name in names.iter() {
            let normalized = resolver.normalizer().normalize(name);
            if !retriever.find_exact(&normalized)?.is_empty() {
                report.existing += 1;
                continue;
            }

            resolver.force_create(name, category)?;
            report.created += 1;
        }
    }

    log::info!(
        "seeded {} ingredients ({} already present)",
        report.created,
        report.existing
    );

    Ok(report)
}
